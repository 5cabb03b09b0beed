use crate::extension::{AdmissionStats, TruncationReport};
use crate::metrics::MetricsSummary;
use crate::request::{RequestId, RequestTrace};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every queue emptied and no arrivals remain
    Drained,
    /// Only requests that can never fit in memory remain
    Stalled,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub total_time: f64,
    pub total_batches: u64,
    pub stop_reason: Option<StopReason>,
    pub summary: MetricsSummary,
    /// Completed requests, in completion order
    pub traces: Vec<RequestTrace>,
    /// Requests left behind because they can never be admitted
    pub stranded: Vec<RequestId>,
    pub admission_control: Option<AdmissionStats>,
    pub truncation: Option<TruncationReport>,
}
