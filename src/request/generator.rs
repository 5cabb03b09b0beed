use super::ArrivalRecord;
use crate::config::{ArrivalPattern, LengthDistribution, WorkloadConfig};
use crate::error::{Result, SimError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Exp, LogNormal, Normal};

/// Produces a reproducible arrival stream from a workload description
pub struct WorkloadGenerator {
    workload: WorkloadConfig,
    rng: StdRng,
    inter_arrival: Option<Exp<f64>>,
    prefill: Sampler,
    decode: Sampler,
}

/// A length distribution with its parameters already checked
enum Sampler {
    Fixed(u64),
    Uniform(u64, u64),
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
    Bimodal {
        short_fraction: f64,
        short: (u64, u64),
        long: (u64, u64),
    },
}

impl Sampler {
    fn new(name: &str, dist: &LengthDistribution) -> Result<Self> {
        let invalid = |reason: String| SimError::InvalidWorkload(format!("{name}: {reason}"));
        if let Some(reason) = dist.invalid_reason() {
            return Err(invalid(reason));
        }

        Ok(match *dist {
            LengthDistribution::Fixed { value } => Sampler::Fixed(value),
            LengthDistribution::Uniform { min, max } => Sampler::Uniform(min, max),
            LengthDistribution::Normal { mean, std_dev } => {
                Sampler::Normal(Normal::new(mean, std_dev).map_err(|e| invalid(e.to_string()))?)
            }
            LengthDistribution::LogNormal { mean, std_dev } => Sampler::LogNormal(
                LogNormal::new(mean, std_dev).map_err(|e| invalid(e.to_string()))?,
            ),
            LengthDistribution::Bimodal {
                short_fraction,
                short,
                long,
            } => Sampler::Bimodal {
                short_fraction,
                short,
                long,
            },
        })
    }

    fn sample(&self, rng: &mut StdRng) -> u64 {
        match *self {
            Sampler::Fixed(value) => value,
            Sampler::Uniform(min, max) => rng.gen_range(min..=max),
            Sampler::Normal(ref normal) => normal.sample(rng).round().max(0.0) as u64,
            Sampler::LogNormal(ref lognormal) => lognormal.sample(rng).round().max(0.0) as u64,
            Sampler::Bimodal {
                short_fraction,
                short,
                long,
            } => {
                let (lo, hi) = if rng.gen_bool(short_fraction) { short } else { long };
                rng.gen_range(lo..=hi)
            }
        }
    }
}

impl WorkloadGenerator {
    pub fn new(workload: WorkloadConfig) -> Result<Self> {
        let inter_arrival = match workload.arrival_pattern {
            ArrivalPattern::Batched => None,
            ArrivalPattern::Poisson | ArrivalPattern::FixedRate => {
                let rate = workload.arrival_rate;
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(SimError::InvalidWorkload(format!(
                        "arrival rate must be positive, got {rate}"
                    )));
                }
                Some(Exp::new(rate).map_err(|e| SimError::InvalidWorkload(e.to_string()))?)
            }
        };

        Ok(Self {
            rng: StdRng::seed_from_u64(workload.seed),
            inter_arrival,
            prefill: Sampler::new("prefill_len_dist", &workload.prefill_len_dist)?,
            decode: Sampler::new("decode_len_dist", &workload.decode_len_dist)?,
            workload,
        })
    }

    /// Generate the whole stream, in arrival order. Decode lengths are at
    /// least one token.
    pub fn generate(&mut self) -> Vec<ArrivalRecord> {
        let mut records = Vec::with_capacity(self.workload.num_requests);
        let mut time = 0.0;

        for _ in 0..self.workload.num_requests {
            time = self.next_arrival(time);
            let prefill_length = self.prefill.sample(&mut self.rng);
            let decode_length = self.decode.sample(&mut self.rng).max(1);
            records.push(ArrivalRecord::new(time, prefill_length, decode_length));
        }
        records
    }

    fn next_arrival(&mut self, current_time: f64) -> f64 {
        match (self.workload.arrival_pattern, &self.inter_arrival) {
            (ArrivalPattern::Poisson, Some(exp)) => current_time + exp.sample(&mut self.rng),
            (ArrivalPattern::FixedRate, _) => current_time + 1.0 / self.workload.arrival_rate,
            _ => current_time,
        }
    }
}
