pub mod admission;
pub mod scheduler;
pub mod simulation;
pub mod system;
pub mod truncation;
pub mod workload;

pub use admission::AdmissionControlConfig;
pub use scheduler::SchedulerConfig;
pub use simulation::SimulationConfig;
pub use system::SystemConfig;
pub use truncation::TruncationConfig;
pub use workload::{ArrivalPattern, LengthDistribution, WorkloadConfig};

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration that aggregates all sub-configs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub admission_control: AdmissionControlConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub truncation: Option<TruncationConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the simulator cannot run.
    pub fn validate(&self) -> Result<()> {
        let system = &self.system;
        if system.memory_capacity == 0 {
            return Err(SimError::ZeroCapacity);
        }
        if system.token_budget == 0 {
            return Err(SimError::ZeroTokenBudget);
        }
        for (name, value) in [
            ("d_0", system.base_latency),
            ("d_1", system.per_token_latency),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidLatency { name, value });
            }
        }

        let gate = &self.admission_control;
        if !(gate.threshold > 0.0 && gate.threshold <= 1.0) {
            return Err(SimError::InvalidThreshold(gate.threshold));
        }

        Ok(())
    }

    /// Get a default configuration for testing
    #[cfg(test)]
    pub fn test_default() -> Self {
        Config {
            system: SystemConfig {
                memory_capacity: 100,
                token_budget: 1000,
                base_latency: 1.0,
                per_token_latency: 0.0,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{AdmissionStrategy, PreemptionMode};

    #[test]
    fn test_config_creation() {
        let config = Config::test_default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.preemption_mode, PreemptionMode::Swap);
        assert_eq!(
            config.scheduler.preemption_strategy,
            AdmissionStrategy::Conservative
        );
        assert!(!config.admission_control.enabled);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut config = Config::test_default();
        config.system.memory_capacity = 0;
        assert!(matches!(config.validate(), Err(SimError::ZeroCapacity)));
    }

    #[test]
    fn test_rejects_zero_budget() {
        let mut config = Config::test_default();
        config.system.token_budget = 0;
        assert!(matches!(config.validate(), Err(SimError::ZeroTokenBudget)));
    }

    #[test]
    fn test_rejects_negative_latency() {
        let mut config = Config::test_default();
        config.system.per_token_latency = -0.5;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidLatency { name: "d_1", .. })
        ));

        let mut config = Config::test_default();
        config.system.base_latency = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidLatency { name: "d_0", .. })
        ));
    }

    #[test]
    fn test_threshold_bounds() {
        let mut config = Config::test_default();
        config.admission_control.enabled = true;

        for bad in [0.0, -0.1, 1.01] {
            config.admission_control.threshold = bad;
            assert!(matches!(
                config.validate(),
                Err(SimError::InvalidThreshold(_))
            ));
        }

        config.admission_control.threshold = 1.0;
        assert!(config.validate().is_ok());

        // Rejected even while the gate is disabled
        config.admission_control.enabled = false;
        config.admission_control.threshold = 7.0;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
            [system]
            M_total = 500
            B = 64
            d_0 = 0.5
            d_1 = 0.01

            [scheduler]
            preemption_mode = "sacrifice"
            preemption_strategy = "aggressive"

            [admission_control]
            enabled = true
            threshold = 0.8

            [truncation]
            at_batch = 10
            arrivals = [{ arrival_time = 0.0, prefill_length = 5, decode_length = 3 }]
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.system.memory_capacity, 500);
        assert_eq!(config.system.token_budget, 64);
        assert_eq!(config.system.per_token_latency, 0.01);
        assert_eq!(config.scheduler.preemption_mode, PreemptionMode::Sacrifice);
        assert_eq!(
            config.scheduler.preemption_strategy,
            AdmissionStrategy::Aggressive
        );
        assert_eq!(config.admission_control.threshold, 0.8);
        assert_eq!(config.simulation.log_interval, 100);
        let truncation = config.truncation.unwrap();
        assert_eq!(truncation.at_batch, 10);
        assert_eq!(truncation.arrivals.len(), 1);
    }

    #[test]
    fn test_load_bundled_scenario() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenario.toml");
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.system.memory_capacity, 1000);
        assert_eq!(config.scheduler.preemption_mode, PreemptionMode::Swap);
        assert!(config.admission_control.enabled);
        assert_eq!(config.simulation.log_interval, 50);

        assert!(matches!(
            Config::from_file("does-not-exist.toml"),
            Err(SimError::Io(_))
        ));
    }

    #[test]
    fn test_parse_workload() {
        let text = r#"
            arrival_pattern = "fixed_rate"
            arrival_rate = 2.0
            num_requests = 40
            seed = 3
            prefill_len_dist = { type = "bimodal", short_fraction = 0.8, short = [200, 250], long = [250, 300] }
            decode_len_dist = { type = "uniform", min = 100, max = 130 }
        "#;
        let workload: WorkloadConfig = toml::from_str(text).unwrap();
        assert_eq!(workload.arrival_pattern, ArrivalPattern::FixedRate);
        assert_eq!(workload.num_requests, 40);
        assert!(matches!(
            workload.decode_len_dist,
            LengthDistribution::Uniform { min: 100, max: 130 }
        ));
        assert!(workload.prefill_len_dist.invalid_reason().is_none());
    }
}
