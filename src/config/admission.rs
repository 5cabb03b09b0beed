use serde::{Deserialize, Serialize};

fn default_threshold() -> f64 {
    1.0
}

/// Memory-pressure gate applied to admissions from the waiting queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionControlConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Fraction of M_total at or above which waiting requests are not admitted
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for AdmissionControlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: default_threshold(),
        }
    }
}
