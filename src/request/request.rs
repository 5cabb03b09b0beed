use super::status::RequestStatus;
use super::trace::RequestTrace;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

pub type RequestId = u64;

/// A single decode job moving through the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID, assigned in ingestion order
    pub id: RequestId,

    /// Arrival time (simulated time)
    pub arrival_time: f64,

    /// Tokens already materialized by the (out-of-scope) prefill phase
    pub prefill_length: u64,

    /// Number of tokens to decode before completion
    pub decode_length: u64,

    pub status: RequestStatus,

    /// Tokens decoded so far, in [0, decode_length]
    pub decode_position: u64,

    /// Most recent transition into RUNNING; drives LIFO eviction
    pub enter_running_time: Option<f64>,

    /// First transition into RUNNING
    pub first_enter_running_time: Option<f64>,

    pub swap_count: u32,
    pub sacrifice_count: u32,

    /// Decode steps executed, including steps later discarded by a sacrifice
    pub executed_steps: u64,

    /// Decode positions thrown away by sacrifices
    pub wasted_positions: u64,

    /// Time spent in the swapped queue
    pub total_swapped_time: f64,

    /// Start of the current swap-out, if swapped
    pub swapped_at: Option<f64>,

    pub completion_time: Option<f64>,
}

impl Request {
    /// Create a new request in the WAITING state
    pub fn new(id: RequestId, arrival_time: f64, prefill_length: u64, decode_length: u64) -> Self {
        Self {
            id,
            arrival_time,
            prefill_length,
            decode_length,
            status: RequestStatus::Waiting,
            decode_position: 0,
            enter_running_time: None,
            first_enter_running_time: None,
            swap_count: 0,
            sacrifice_count: 0,
            executed_steps: 0,
            wasted_positions: 0,
            total_swapped_time: 0.0,
            swapped_at: None,
            completion_time: None,
        }
    }

    /// Memory held on the accelerator; zero unless RUNNING
    pub fn footprint(&self) -> u64 {
        match self.status {
            RequestStatus::Running => self.memory_requirement(),
            _ => 0,
        }
    }

    /// Memory the request would hold if it were running now
    pub fn memory_requirement(&self) -> u64 {
        self.prefill_length + self.decode_position
    }

    /// Largest footprint the request reaches while it can still be resident.
    ///
    /// The final decode step completes the request, so the position never sits
    /// at `decode_length` while it is running.
    pub fn peak_footprint(&self) -> u64 {
        self.prefill_length + self.decode_length.saturating_sub(1)
    }

    /// Whether the request can ever run to completion on `capacity` tokens
    pub fn fits_within(&self, capacity: u64) -> bool {
        self.peak_footprint() <= capacity
    }

    pub fn remaining_decode(&self) -> u64 {
        self.decode_length.saturating_sub(self.decode_position)
    }

    pub fn is_finished(&self) -> bool {
        self.decode_position >= self.decode_length
    }

    /// Whether the request has ever been resident
    pub fn has_run(&self) -> bool {
        self.first_enter_running_time.is_some()
    }

    /// Key ordering requests by when they last entered RUNNING, oldest first
    pub fn seniority(&self) -> (OrderedFloat<f64>, RequestId) {
        let since = self.enter_running_time.unwrap_or(self.arrival_time);
        (OrderedFloat(since), self.id)
    }

    /// Transition WAITING or SWAPPED into RUNNING at `now`
    pub fn enter_running(&mut self, now: f64) {
        debug_assert!(matches!(
            self.status,
            RequestStatus::Waiting | RequestStatus::Swapped
        ));
        if let Some(swapped_at) = self.swapped_at.take() {
            self.total_swapped_time += now - swapped_at;
        }
        self.status = RequestStatus::Running;
        self.enter_running_time = Some(now);
        if self.first_enter_running_time.is_none() {
            self.first_enter_running_time = Some(now);
        }
    }

    /// Evict to the swapped queue, keeping decode progress
    pub fn swap_out(&mut self, now: f64) {
        debug_assert_eq!(self.status, RequestStatus::Running);
        self.status = RequestStatus::Swapped;
        self.swap_count += 1;
        self.swapped_at = Some(now);
    }

    /// Evict back to waiting, discarding decode progress. Returns the
    /// number of positions lost.
    pub fn sacrifice(&mut self) -> u64 {
        debug_assert_eq!(self.status, RequestStatus::Running);
        let wasted = self.decode_position;
        self.status = RequestStatus::Waiting;
        self.sacrifice_count += 1;
        self.wasted_positions += wasted;
        self.decode_position = 0;
        wasted
    }

    /// Decode one token. Returns true once the request has produced all of
    /// its output.
    pub fn advance(&mut self) -> bool {
        debug_assert_eq!(self.status, RequestStatus::Running);
        debug_assert!(self.decode_position < self.decode_length);
        self.decode_position += 1;
        self.executed_steps += 1;
        self.is_finished()
    }

    pub fn complete(&mut self, now: f64) {
        debug_assert!(self.is_finished());
        self.status = RequestStatus::Completed;
        self.completion_time = Some(now);
    }

    /// Completion minus arrival
    pub fn total_delay(&self) -> Option<f64> {
        self.completion_time.map(|t| t - self.arrival_time)
    }

    /// First entry into RUNNING minus arrival
    pub fn waiting_time(&self) -> Option<f64> {
        self.first_enter_running_time.map(|t| t - self.arrival_time)
    }

    /// Completion minus first entry into RUNNING
    pub fn execution_time(&self) -> Option<f64> {
        match (self.first_enter_running_time, self.completion_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Snapshot of the request's lifetime statistics
    pub fn trace(&self) -> RequestTrace {
        RequestTrace {
            req_id: self.id,
            arrival_time: self.arrival_time,
            prefill_length: self.prefill_length,
            decode_length: self.decode_length,
            completion_time: self.completion_time,
            total_delay: self.total_delay(),
            waiting_time: self.waiting_time(),
            execution_time: self.execution_time(),
            swap_count: self.swap_count,
            sacrifice_count: self.sacrifice_count,
            total_swapped_time: self.total_swapped_time,
            executed_steps: self.executed_steps,
            wasted_positions: self.wasted_positions,
        }
    }
}
