use crate::extension::TruncationReport;
use crate::request::{Request, RequestId};
use serde::{Deserialize, Serialize};

/// Live simulation state captured between steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub time: f64,
    /// Id of the next batch to execute
    pub batch_id: u64,
    pub next_request_id: RequestId,
    pub completed_count: u64,
    pub waiting: Vec<Request>,
    pub running: Vec<Request>,
    pub swapped: Vec<Request>,
    /// Set once the arrival stream has been cut over
    #[serde(default)]
    pub truncation: Option<TruncationReport>,
}

impl Checkpoint {
    /// Requests held in the three live queues
    pub fn live_count(&self) -> usize {
        self.waiting.len() + self.running.len() + self.swapped.len()
    }
}
