use serde::{Deserialize, Serialize};

/// One record per executed batch step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    /// Clock at the start of the step
    pub time: f64,
    pub batch_id: u64,
    pub batch_count: usize,
    pub batch_tokens: u64,
    pub running_count: usize,
    pub waiting_count: usize,
    pub swapped_count: usize,
    /// Memory held while the batch executed
    pub gpu_memory_used: u64,
    pub completed_count: u64,
    pub batch_duration: f64,
    pub admitted: usize,
    pub swapped_out: usize,
    pub sacrificed: usize,
}
