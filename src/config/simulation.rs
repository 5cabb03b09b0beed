use serde::{Deserialize, Serialize};

fn default_log_interval() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Log progress every N batches
    #[serde(default = "default_log_interval")]
    pub log_interval: u64,

    /// Batch ids after which a checkpoint of the live state is captured
    #[serde(default)]
    pub checkpoint_batches: Vec<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            log_interval: default_log_interval(),
            checkpoint_batches: Vec::new(),
        }
    }
}
