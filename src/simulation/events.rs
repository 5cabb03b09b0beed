use crate::request::RequestId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Arrival { prefill_length: u64, decode_length: u64 },
    Admission,
    SwapIn { decode_position: u64 },
    SwapOut { decode_position: u64, memory_freed: u64 },
    Sacrifice { decode_position: u64, memory_freed: u64 },
    Completion { total_delay: f64 },
    /// The request can never fit in memory and will not be admitted
    Unschedulable { peak_footprint: u64, capacity: u64 },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Arrival { .. } => "arrival",
            EventKind::Admission => "admission",
            EventKind::SwapIn { .. } => "swap_in",
            EventKind::SwapOut { .. } => "swap_out",
            EventKind::Sacrifice { .. } => "sacrifice",
            EventKind::Completion { .. } => "completion",
            EventKind::Unschedulable { .. } => "unschedulable",
        }
    }
}

/// A discrete lifecycle event for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimEvent {
    pub time: f64,
    pub batch_id: u64,
    pub req_id: RequestId,
    #[serde(flatten)]
    pub kind: EventKind,
}
