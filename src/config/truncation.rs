use crate::request::ArrivalRecord;
use serde::{Deserialize, Serialize};

/// Replace the remaining arrival stream once the simulation reaches a batch.
///
/// Arrival times in `arrivals` are relative to the moment of truncation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncationConfig {
    pub at_batch: u64,
    #[serde(default)]
    pub arrivals: Vec<ArrivalRecord>,
}
