use serde::Serialize;

/// Summary of all metrics from the simulation
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    // Latency metrics (simulated time units)
    pub delay_mean: f64,
    pub delay_p50: f64,
    pub delay_p90: f64,
    pub delay_p99: f64,
    pub delay_max: f64,

    pub waiting_mean: f64,
    pub waiting_p50: f64,
    pub waiting_p90: f64,
    pub waiting_p99: f64,

    pub execution_mean: f64,

    // Throughput metrics
    pub requests_per_sec: f64,
    /// Useful decoded tokens per unit time
    pub tokens_per_sec: f64,
    /// Decode positions thrown away by sacrifices
    pub wasted_tokens: u64,

    // Resource utilization (average over all steps)
    pub avg_memory_util: f64,
    pub avg_batch_size: f64,

    // Preemption metrics
    pub total_swaps: u64,
    pub swaps_per_request_mean: f64,
    pub total_sacrifices: u64,
    pub sacrifices_per_request_mean: f64,

    // Request counts
    pub completed_requests: u64,
    pub total_requests: u64,
}
