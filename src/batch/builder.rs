use crate::request::{Request, RequestId};

/// Requests chosen to decode in one step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPlan {
    /// Selected ids, oldest entry into RUNNING first
    pub members: Vec<RequestId>,
    /// Sum of the members' footprints
    pub batch_tokens: u64,
}

impl BatchPlan {
    pub fn batch_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Picks the subset of the running set that executes under the token budget
#[derive(Debug, Clone, Copy)]
pub struct BatchBuilder {
    token_budget: u64,
}

impl BatchBuilder {
    pub fn new(token_budget: u64) -> Self {
        Self { token_budget }
    }

    /// Take the longest prefix of `running`, ordered by
    /// `(enter_running_time, id)`, whose footprints fit in the budget.
    ///
    /// A first request that alone exceeds the budget runs by itself;
    /// otherwise it could never decode.
    pub fn select(&self, running: &[Request]) -> BatchPlan {
        let mut ordered: Vec<&Request> = running.iter().collect();
        ordered.sort_by_key(|r| r.seniority());

        let mut plan = BatchPlan::default();
        for request in ordered {
            let footprint = request.footprint();
            if plan.batch_tokens + footprint > self.token_budget {
                if plan.is_empty() {
                    plan.members.push(request.id);
                    plan.batch_tokens = footprint;
                }
                break;
            }
            plan.members.push(request.id);
            plan.batch_tokens += footprint;
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(id: RequestId, entered: f64, prefill: u64) -> Request {
        let mut req = Request::new(id, 0.0, prefill, 10);
        req.enter_running(entered);
        req
    }

    #[test]
    fn test_selects_everything_under_budget() {
        let builder = BatchBuilder::new(100);
        let set = vec![running(0, 0.0, 20), running(1, 1.0, 30)];

        let plan = builder.select(&set);
        assert_eq!(plan.members, vec![0, 1]);
        assert_eq!(plan.batch_tokens, 50);
        assert_eq!(plan.batch_count(), 2);
    }

    #[test]
    fn test_respects_budget_in_entry_order() {
        let builder = BatchBuilder::new(50);
        // Listed out of order on purpose
        let set = vec![
            running(2, 3.0, 10),
            running(0, 1.0, 30),
            running(1, 2.0, 15),
        ];

        let plan = builder.select(&set);
        assert_eq!(plan.members, vec![0, 1]);
        assert_eq!(plan.batch_tokens, 45);
        assert!(plan.batch_tokens <= 50);
    }

    #[test]
    fn test_stops_at_first_overflow() {
        let builder = BatchBuilder::new(50);
        let set = vec![
            running(0, 0.0, 30),
            running(1, 1.0, 30),
            running(2, 2.0, 5),
        ];

        // The later small request does not jump the queue
        let plan = builder.select(&set);
        assert_eq!(plan.members, vec![0]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let builder = BatchBuilder::new(25);
        let set = vec![running(5, 1.0, 20), running(3, 1.0, 20)];

        let plan = builder.select(&set);
        assert_eq!(plan.members, vec![3]);
    }

    #[test]
    fn test_oversized_request_runs_alone() {
        let builder = BatchBuilder::new(50);
        let set = vec![running(0, 0.0, 60), running(1, 1.0, 5)];

        let plan = builder.select(&set);
        assert_eq!(plan.members, vec![0]);
        assert_eq!(plan.batch_tokens, 60);
    }

    #[test]
    fn test_empty_running_set() {
        let builder = BatchBuilder::new(50);
        let plan = builder.select(&[]);
        assert!(plan.is_empty());
        assert_eq!(plan.batch_tokens, 0);
    }
}
