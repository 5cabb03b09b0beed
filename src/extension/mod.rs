//! Optional stages layered around the core scheduler.
//!
//! Each stage hooks one or more points of the step: after arrivals are
//! ingested, before each admission from the waiting queue, and after a batch
//! executes.

pub mod gate;
pub mod truncation;

pub use gate::{AdmissionGate, AdmissionStats};
pub use truncation::{LoadTruncation, TruncationReport};

use crate::config::Config;
use crate::error::Result;
use crate::request::ArrivalQueue;

#[derive(Debug, Clone)]
pub enum SchedulerExtension {
    AdmissionGate(AdmissionGate),
    LoadTruncation(LoadTruncation),
}

/// Ordered set of enabled extensions
#[derive(Debug, Clone, Default)]
pub struct ExtensionPipeline {
    stages: Vec<SchedulerExtension>,
}

impl ExtensionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the extensions a configuration asks for
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut pipeline = Self::new();
        if config.admission_control.enabled {
            pipeline = pipeline.with(SchedulerExtension::AdmissionGate(AdmissionGate::new(
                config.admission_control.threshold,
            )));
        }
        if let Some(truncation) = &config.truncation {
            pipeline = pipeline.with(SchedulerExtension::LoadTruncation(LoadTruncation::new(
                truncation,
            )?));
        }
        Ok(pipeline)
    }

    pub fn with(mut self, stage: SchedulerExtension) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs once arrivals due by `now` have been ingested
    pub fn before_step(&mut self, batch_id: u64, now: f64, arrivals: &mut ArrivalQueue) {
        for stage in &mut self.stages {
            if let SchedulerExtension::LoadTruncation(truncation) = stage {
                truncation.before_step(batch_id, now, arrivals);
            }
        }
    }

    /// Carry a cut-over that already happened into a resumed run
    pub fn restore_truncation(&mut self, report: TruncationReport) {
        for stage in &mut self.stages {
            if let SchedulerExtension::LoadTruncation(truncation) = stage {
                truncation.restore(report.clone());
            }
        }
    }

    /// Every gate must agree before a waiting request is admitted
    pub fn permits_waiting_admission(&mut self, used: u64, capacity: u64) -> bool {
        self.stages.iter_mut().all(|stage| match stage {
            SchedulerExtension::AdmissionGate(gate) => gate.permits(used, capacity),
            SchedulerExtension::LoadTruncation(_) => true,
        })
    }

    /// Runs after a batch executes against `used` tokens of memory
    pub fn after_step(&mut self, used: u64, capacity: u64, duration: f64) {
        for stage in &mut self.stages {
            if let SchedulerExtension::AdmissionGate(gate) = stage {
                gate.observe_step(used, capacity, duration);
            }
        }
    }

    pub fn admission_stats(&self) -> Option<&AdmissionStats> {
        self.stages.iter().find_map(|stage| match stage {
            SchedulerExtension::AdmissionGate(gate) => Some(gate.stats()),
            _ => None,
        })
    }

    pub fn truncation_report(&self) -> Option<&TruncationReport> {
        self.stages.iter().find_map(|stage| match stage {
            SchedulerExtension::LoadTruncation(truncation) => truncation.report(),
            _ => None,
        })
    }
}
