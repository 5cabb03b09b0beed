/// Compute engine for calculating batch step timing

use crate::config::SystemConfig;

/// Linear step-cost model: `d_0 + d_1 * batch_tokens`
#[derive(Debug, Clone, Copy)]
pub struct ComputeEngine {
    base_latency: f64,
    per_token_latency: f64,
}

impl ComputeEngine {
    pub fn new(system: &SystemConfig) -> Self {
        Self {
            base_latency: system.base_latency,
            per_token_latency: system.per_token_latency,
        }
    }

    /// Duration of one decode step over a batch holding `batch_tokens` of
    /// footprint. An empty batch still pays the fixed cost.
    pub fn calculate_iteration_time(&self, batch_tokens: u64) -> f64 {
        self.base_latency + self.per_token_latency * batch_tokens as f64
    }

    /// Tokens per second the batch achieves, counting one decoded token per
    /// member
    pub fn decode_throughput(&self, batch_count: usize, duration: f64) -> f64 {
        if duration == 0.0 {
            return 0.0;
        }
        batch_count as f64 / duration
    }
}
