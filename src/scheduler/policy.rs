use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fate of a running request evicted to free memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreemptionMode {
    /// Keep decode progress and park the request in the swapped queue
    #[default]
    Swap,
    /// Discard decode progress and return the request to the head of waiting
    Sacrifice,
}

/// Whether an admission is allowed to push established work out of memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionStrategy {
    /// Admissions that do not fit are rolled back; running requests stay put
    #[default]
    Conservative,
    /// Swapped (and optionally waiting) admissions may displace running
    /// requests that arrived after them
    Aggressive,
}

impl FromStr for PreemptionMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "swap" => Ok(PreemptionMode::Swap),
            "sacrifice" => Ok(PreemptionMode::Sacrifice),
            _ => Err(SimError::UnknownPreemptionMode(s.to_string())),
        }
    }
}

impl FromStr for AdmissionStrategy {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(AdmissionStrategy::Conservative),
            "aggressive" => Ok(AdmissionStrategy::Aggressive),
            _ => Err(SimError::UnknownAdmissionStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for PreemptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreemptionMode::Swap => write!(f, "swap"),
            PreemptionMode::Sacrifice => write!(f, "sacrifice"),
        }
    }
}

impl fmt::Display for AdmissionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionStrategy::Conservative => write!(f, "conservative"),
            AdmissionStrategy::Aggressive => write!(f, "aggressive"),
        }
    }
}
