use serde::{Deserialize, Serialize};

/// Request status in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Queued for admission, holding no memory
    Waiting,
    /// Resident on the accelerator and eligible for batching
    Running,
    /// Evicted with its progress parked off-accelerator
    Swapped,
    /// Finished decoding; terminal
    Completed,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Waiting => write!(f, "Waiting"),
            RequestStatus::Running => write!(f, "Running"),
            RequestStatus::Swapped => write!(f, "Swapped"),
            RequestStatus::Completed => write!(f, "Completed"),
        }
    }
}
