use super::request::RequestId;
use serde::{Deserialize, Serialize};

/// Per-request summary reported at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTrace {
    pub req_id: RequestId,
    pub arrival_time: f64,
    pub prefill_length: u64,
    pub decode_length: u64,
    pub completion_time: Option<f64>,
    pub total_delay: Option<f64>,
    pub waiting_time: Option<f64>,
    pub execution_time: Option<f64>,
    pub swap_count: u32,
    pub sacrifice_count: u32,
    pub total_swapped_time: f64,
    pub executed_steps: u64,
    pub wasted_positions: u64,
}
