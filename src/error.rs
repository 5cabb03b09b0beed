use thiserror::Error;

/// Errors raised while configuring or constructing a simulation.
///
/// Every variant is fatal: the simulator refuses to start. Once running, the
/// loop itself never fails.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("memory capacity (M_total) must be positive")]
    ZeroCapacity,

    #[error("batch token budget (B) must be positive")]
    ZeroTokenBudget,

    #[error("latency coefficient {name} must be a finite non-negative number, got {value}")]
    InvalidLatency { name: &'static str, value: f64 },

    #[error("admission control threshold must lie in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("invalid arrival at index {index}: {reason}")]
    InvalidArrival { index: usize, reason: String },

    #[error("invalid workload: {0}")]
    InvalidWorkload(String),

    #[error("unknown preemption mode: {0}")]
    UnknownPreemptionMode(String),

    #[error("unknown admission strategy: {0}")]
    UnknownAdmissionStrategy(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
