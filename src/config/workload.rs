use serde::{Deserialize, Serialize};

/// Synthetic arrival stream, used when no explicit arrival list is given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    #[serde(default)]
    pub arrival_pattern: ArrivalPattern,

    /// Mean arrivals per unit of simulated time
    pub arrival_rate: f64,

    pub num_requests: usize,

    pub prefill_len_dist: LengthDistribution,
    pub decode_len_dist: LengthDistribution,

    /// Random seed for reproducibility
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalPattern {
    /// Exponentially distributed inter-arrival times
    #[default]
    Poisson,
    /// Exactly `1 / arrival_rate` between arrivals
    FixedRate,
    /// Everything arrives at time 0
    Batched,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LengthDistribution {
    Fixed { value: u64 },
    Uniform { min: u64, max: u64 },
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mean: f64, std_dev: f64 },
    /// Short requests with probability `short_fraction`, long ones otherwise
    Bimodal {
        short_fraction: f64,
        short: (u64, u64),
        long: (u64, u64),
    },
}

impl LengthDistribution {
    /// Bounds check, without sampling
    pub fn invalid_reason(&self) -> Option<String> {
        match *self {
            LengthDistribution::Fixed { .. } => None,
            LengthDistribution::Uniform { min, max } if min > max => {
                Some(format!("uniform range {min}..={max} is empty"))
            }
            LengthDistribution::Normal { mean, std_dev }
            | LengthDistribution::LogNormal { mean, std_dev }
                if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 =>
            {
                Some(format!("mean {mean} / std_dev {std_dev} are not usable"))
            }
            LengthDistribution::Bimodal {
                short_fraction,
                short,
                long,
            } => {
                if !(0.0..=1.0).contains(&short_fraction) {
                    Some(format!("short_fraction {short_fraction} outside [0, 1]"))
                } else if short.0 > short.1 || long.0 > long.1 {
                    Some("bimodal ranges must be non-empty".to_string())
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
