use super::checkpoint::Checkpoint;
use crate::request::{Request, RequestId, RequestStatus};
use crate::scheduler::PreemptionMode;
use std::collections::VecDeque;

/// The three live queues plus the memory model they are measured against.
///
/// Every live request sits in exactly one of `waiting`, `running` or
/// `swapped`; completed requests are removed and only counted.
#[derive(Debug, Clone)]
pub struct SystemState {
    /// Memory capacity in tokens (M_total)
    capacity: u64,

    /// Per-step execution budget in tokens (B)
    token_budget: u64,

    time: f64,

    /// FCFS queue; sacrificed requests re-enter at the head
    waiting: VecDeque<Request>,

    running: Vec<Request>,

    /// Ordered by swap-out time
    swapped: VecDeque<Request>,

    completed_count: u64,
}

impl SystemState {
    pub fn new(capacity: u64, token_budget: u64) -> Self {
        Self {
            capacity,
            token_budget,
            time: 0.0,
            waiting: VecDeque::new(),
            running: Vec::new(),
            swapped: VecDeque::new(),
            completed_count: 0,
        }
    }

    /// Rebuild state from a checkpoint, normalizing each request's status to
    /// the queue it was captured in.
    pub fn restore(capacity: u64, token_budget: u64, checkpoint: &Checkpoint) -> Self {
        let with_status = |requests: &[Request], status: RequestStatus| {
            requests
                .iter()
                .cloned()
                .map(|mut r| {
                    r.status = status;
                    r
                })
                .collect::<Vec<_>>()
        };

        Self {
            capacity,
            token_budget,
            time: checkpoint.time,
            waiting: with_status(&checkpoint.waiting, RequestStatus::Waiting).into(),
            running: with_status(&checkpoint.running, RequestStatus::Running),
            swapped: with_status(&checkpoint.swapped, RequestStatus::Swapped).into(),
            completed_count: checkpoint.completed_count,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn token_budget(&self) -> u64 {
        self.token_budget
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Move the clock forward; it never runs backwards
    pub fn advance_clock(&mut self, to: f64) {
        debug_assert!(to >= self.time);
        self.time = self.time.max(to);
    }

    pub fn waiting(&self) -> &VecDeque<Request> {
        &self.waiting
    }

    pub fn running(&self) -> &[Request] {
        &self.running
    }

    pub fn swapped(&self) -> &VecDeque<Request> {
        &self.swapped
    }

    pub fn completed_count(&self) -> u64 {
        self.completed_count
    }

    /// Requests in any of the three live queues
    pub fn live_count(&self) -> usize {
        self.waiting.len() + self.running.len() + self.swapped.len()
    }

    /// Total footprint of the running set
    pub fn gpu_memory_used(&self) -> u64 {
        self.running.iter().map(Request::footprint).sum()
    }

    /// Capacity left; negative while phase 1 has overcommitted memory
    pub fn available_memory(&self) -> i64 {
        self.capacity as i64 - self.gpu_memory_used() as i64
    }

    pub fn memory_utilization(&self) -> f64 {
        self.gpu_memory_used() as f64 / self.capacity as f64
    }

    /// Whether `request` can ever complete within this capacity
    pub fn is_schedulable(&self, request: &Request) -> bool {
        request.fits_within(self.capacity)
    }

    /// True when some live request could still make progress
    pub fn has_schedulable_work(&self) -> bool {
        !self.running.is_empty()
            || self.swapped.iter().any(|r| self.is_schedulable(r))
            || self.waiting.iter().any(|r| self.is_schedulable(r))
    }

    /// True when every live queue is empty
    pub fn is_drained(&self) -> bool {
        self.live_count() == 0
    }

    /// Ids of live requests that can never be admitted
    pub fn unschedulable(&self) -> Vec<RequestId> {
        self.waiting
            .iter()
            .chain(self.swapped.iter())
            .filter(|r| !self.is_schedulable(r))
            .map(|r| r.id)
            .collect()
    }

    /// Append a newly arrived request to the tail of waiting
    pub fn enqueue(&mut self, request: Request) {
        debug_assert_eq!(request.status, RequestStatus::Waiting);
        self.waiting.push_back(request);
    }

    /// Move a waiting or swapped request into running at `now`.
    ///
    /// Returns a copy of the request as it was before admission, which is
    /// what [`SystemState::restore_retracted`] puts back if the admission is
    /// rolled back.
    pub fn admit(&mut self, id: RequestId, now: f64) -> Option<Request> {
        let mut request = take_from(&mut self.swapped, id).or_else(|| take_from(&mut self.waiting, id))?;
        let prior = request.clone();
        request.enter_running(now);
        self.running.push(request);
        Some(prior)
    }

    /// Drop the running copy of a request admitted in the current cycle
    pub fn retract(&mut self, id: RequestId) -> bool {
        match self.running.iter().position(|r| r.id == id) {
            Some(idx) => {
                self.running.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Put rolled-back admissions back where they came from, ahead of the
    /// requests that were never picked. `priors` is in admission order.
    pub fn restore_retracted(&mut self, priors: Vec<Request>) {
        for request in priors.into_iter().rev() {
            match request.status {
                RequestStatus::Swapped => self.swapped.push_front(request),
                _ => self.waiting.push_front(request),
            }
        }
    }

    /// Detach a running request, applying the preemption mode to it
    pub fn evict(&mut self, id: RequestId, mode: PreemptionMode, now: f64) -> Option<Request> {
        let idx = self.running.iter().position(|r| r.id == id)?;
        let mut request = self.running.remove(idx);
        match mode {
            PreemptionMode::Swap => request.swap_out(now),
            PreemptionMode::Sacrifice => {
                request.sacrifice();
            }
        }
        Some(request)
    }

    /// Queue evicted requests. `victims` is in eviction order.
    ///
    /// Swapped victims join the tail of the swapped queue. Sacrificed victims
    /// are pushed onto the head of waiting one by one, so the last victim
    /// evicted ends up first.
    pub fn place_evicted_batch(&mut self, victims: Vec<Request>, mode: PreemptionMode) {
        for request in victims {
            match mode {
                PreemptionMode::Swap => {
                    debug_assert_eq!(request.status, RequestStatus::Swapped);
                    self.swapped.push_back(request);
                }
                PreemptionMode::Sacrifice => {
                    debug_assert_eq!(request.status, RequestStatus::Waiting);
                    self.waiting.push_front(request);
                }
            }
        }
    }

    /// Decode one token for each listed running request. Returns the ids
    /// that reached their decode length.
    pub fn advance_batch(&mut self, members: &[RequestId]) -> Vec<RequestId> {
        let mut finished = Vec::new();
        for &id in members {
            if let Some(request) = self.running.iter_mut().find(|r| r.id == id) {
                if request.advance() {
                    finished.push(id);
                }
            }
        }
        finished
    }

    /// Remove a finished request from running and count it
    pub fn complete(&mut self, id: RequestId, now: f64) -> Option<Request> {
        let idx = self.running.iter().position(|r| r.id == id)?;
        let mut request = self.running.remove(idx);
        request.complete(now);
        self.completed_count += 1;
        Some(request)
    }

    /// Copy of the live queues for checkpointing
    pub fn queues(&self) -> (Vec<Request>, Vec<Request>, Vec<Request>) {
        (
            self.waiting.iter().cloned().collect(),
            self.running.clone(),
            self.swapped.iter().cloned().collect(),
        )
    }
}

fn take_from(queue: &mut VecDeque<Request>, id: RequestId) -> Option<Request> {
    let idx = queue.iter().position(|r| r.id == id)?;
    queue.remove(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<'a>(requests: impl IntoIterator<Item = &'a Request>) -> Vec<RequestId> {
        requests.into_iter().map(|r| r.id).collect()
    }

    fn state_with_waiting(specs: &[(u64, u64)]) -> SystemState {
        let mut state = SystemState::new(100, 50);
        for (id, &(prefill, decode)) in specs.iter().enumerate() {
            state.enqueue(Request::new(id as RequestId, 0.0, prefill, decode));
        }
        state
    }

    #[test]
    fn test_memory_counts_running_only() {
        let mut state = state_with_waiting(&[(30, 5), (40, 5)]);
        assert_eq!(state.gpu_memory_used(), 0);
        assert_eq!(state.available_memory(), 100);

        state.admit(0, 0.0);
        assert_eq!(state.gpu_memory_used(), 30);
        assert_eq!(state.available_memory(), 70);

        state.admit(1, 0.0);
        state.advance_batch(&[0, 1]);
        assert_eq!(state.gpu_memory_used(), 72);
        assert!((state.memory_utilization() - 0.72).abs() < 1e-12);
    }

    #[test]
    fn test_admit_prefers_swapped_copy_and_preserves_position() {
        let mut state = state_with_waiting(&[(30, 5)]);
        state.admit(0, 0.0);
        state.advance_batch(&[0]);
        let evicted = state.evict(0, PreemptionMode::Swap, 1.0).unwrap();
        state.place_evicted_batch(vec![evicted], PreemptionMode::Swap);
        assert_eq!(state.swapped().len(), 1);

        let prior = state.admit(0, 2.0).unwrap();
        assert_eq!(prior.status, RequestStatus::Swapped);
        assert_eq!(state.running()[0].decode_position, 1);
        assert_eq!(state.running()[0].enter_running_time, Some(2.0));
        assert!(state.swapped().is_empty());
    }

    #[test]
    fn test_admit_unknown_id() {
        let mut state = state_with_waiting(&[(30, 5)]);
        assert!(state.admit(9, 0.0).is_none());
        assert_eq!(state.waiting().len(), 1);
    }

    #[test]
    fn test_sacrificed_victims_go_to_head() {
        let mut state = state_with_waiting(&[(10, 5), (10, 5), (10, 5), (10, 5)]);
        state.admit(0, 0.0);
        state.admit(1, 1.0);
        state.admit(2, 2.0);

        // LIFO order: newest first
        let victims = vec![
            state.evict(2, PreemptionMode::Sacrifice, 3.0).unwrap(),
            state.evict(1, PreemptionMode::Sacrifice, 3.0).unwrap(),
        ];
        state.place_evicted_batch(victims, PreemptionMode::Sacrifice);

        assert_eq!(ids(state.waiting()), vec![1, 2, 3]);
        assert!(state.waiting().iter().all(|r| r.decode_position == 0));
    }

    #[test]
    fn test_swapped_victims_keep_eviction_order() {
        let mut state = state_with_waiting(&[(10, 5), (10, 5), (10, 5)]);
        for id in 0..3 {
            state.admit(id, id as f64);
        }
        let victims = vec![
            state.evict(2, PreemptionMode::Swap, 3.0).unwrap(),
            state.evict(1, PreemptionMode::Swap, 3.0).unwrap(),
        ];
        state.place_evicted_batch(victims, PreemptionMode::Swap);
        assert_eq!(ids(state.swapped()), vec![2, 1]);
        assert!(state.swapped().iter().all(|r| r.swap_count == 1));
    }

    #[test]
    fn test_restore_retracted_returns_to_origin() {
        let mut state = state_with_waiting(&[(10, 5), (10, 5), (10, 5)]);
        let first = state.admit(0, 1.0).unwrap();
        let second = state.admit(1, 1.0).unwrap();

        assert!(state.retract(0));
        assert!(state.retract(1));
        state.restore_retracted(vec![first, second]);

        assert_eq!(ids(state.waiting()), vec![0, 1, 2]);
        assert!(state.running().is_empty());
        let head = &state.waiting()[0];
        assert_eq!(head.status, RequestStatus::Waiting);
        assert!(head.enter_running_time.is_none());
        assert!(!head.has_run());
    }

    #[test]
    fn test_complete_removes_and_counts() {
        let mut state = state_with_waiting(&[(10, 1)]);
        state.admit(0, 0.0);
        let finished = state.advance_batch(&[0]);
        assert_eq!(finished, vec![0]);

        let done = state.complete(0, 1.5).unwrap();
        assert_eq!(done.completion_time, Some(1.5));
        assert_eq!(state.completed_count(), 1);
        assert!(state.is_drained());
    }

    #[test]
    fn test_unschedulable_detection() {
        let state = state_with_waiting(&[(120, 5), (10, 5)]);
        assert_eq!(state.unschedulable(), vec![0]);
        assert!(state.has_schedulable_work());

        let only_oversized = state_with_waiting(&[(98, 5)]);
        assert!(!only_oversized.has_schedulable_work());
        assert!(!only_oversized.is_drained());
    }
}
