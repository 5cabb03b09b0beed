use serde::{Deserialize, Serialize};

/// Capacity and cost model of the simulated accelerator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Total memory capacity in tokens (M_total)
    #[serde(alias = "M_total")]
    pub memory_capacity: u64,

    /// Maximum total footprint executed in one batch (B)
    #[serde(alias = "B")]
    pub token_budget: u64,

    /// Fixed cost of every batch step (d_0)
    #[serde(alias = "d_0", default)]
    pub base_latency: f64,

    /// Cost per token of batch footprint (d_1)
    #[serde(alias = "d_1", default)]
    pub per_token_latency: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            memory_capacity: 1000,
            token_budget: 1000,
            base_latency: 1.0,
            per_token_latency: 0.0,
        }
    }
}
