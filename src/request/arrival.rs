use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One entry of the external arrival stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrivalRecord {
    pub arrival_time: f64,
    pub prefill_length: u64,
    pub decode_length: u64,
}

impl ArrivalRecord {
    pub fn new(arrival_time: f64, prefill_length: u64, decode_length: u64) -> Self {
        Self {
            arrival_time,
            prefill_length,
            decode_length,
        }
    }
}

/// Pending arrivals, consumed in time order as the clock passes them
#[derive(Debug, Clone, Default)]
pub struct ArrivalQueue {
    pending: VecDeque<ArrivalRecord>,
}

impl ArrivalQueue {
    /// Validate and queue an arrival stream.
    ///
    /// Times must be finite, non-negative and non-decreasing, and every
    /// request must decode at least one token.
    pub fn new<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = ArrivalRecord>,
    {
        let pending = validate(records)?;
        Ok(Self { pending })
    }

    /// Pop the next arrival if it has arrived by `now`
    pub fn next_if_before(&mut self, now: f64) -> Option<ArrivalRecord> {
        match self.pending.front() {
            Some(record) if record.arrival_time <= now => self.pending.pop_front(),
            _ => None,
        }
    }

    /// Time of the next pending arrival
    pub fn peek_time(&self) -> Option<f64> {
        self.pending.front().map(|r| r.arrival_time)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending arrival and queue `replacement` shifted by
    /// `offset`. Returns how many arrivals were dropped.
    pub fn replace(&mut self, replacement: &ArrivalQueue, offset: f64) -> usize {
        let dropped = self.pending.len();
        self.pending = replacement
            .pending
            .iter()
            .map(|r| ArrivalRecord {
                arrival_time: r.arrival_time + offset,
                ..*r
            })
            .collect();
        dropped
    }

    /// Iterate over the pending arrivals in order
    pub fn iter(&self) -> impl Iterator<Item = &ArrivalRecord> {
        self.pending.iter()
    }
}

fn validate<I>(records: I) -> Result<VecDeque<ArrivalRecord>>
where
    I: IntoIterator<Item = ArrivalRecord>,
{
    let mut pending = VecDeque::new();
    let mut last = f64::NEG_INFINITY;

    for (index, record) in records.into_iter().enumerate() {
        let invalid = |reason: String| SimError::InvalidArrival { index, reason };

        if !record.arrival_time.is_finite() || record.arrival_time < 0.0 {
            return Err(invalid(format!(
                "arrival time {} is not a finite non-negative number",
                record.arrival_time
            )));
        }
        if record.arrival_time < last {
            return Err(invalid(format!(
                "arrival time {} precedes the previous arrival at {}",
                record.arrival_time, last
            )));
        }
        if record.decode_length == 0 {
            return Err(invalid("decode length must be at least 1".to_string()));
        }

        last = record.arrival_time;
        pending.push_back(record);
    }

    Ok(pending)
}
