use serde::Serialize;

/// Counters kept by the admission-control gate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdmissionStats {
    pub threshold: f64,
    /// Scheduling cycles in which the gate turned away a waiting request
    pub rejected_cycles: u64,
    /// Executed steps observed by the gate
    pub observed_steps: u64,
    /// Highest memory ratio seen during an executed step
    pub max_memory_ratio: f64,
    /// Simulated time spent executing at or above the threshold
    pub time_above_threshold: f64,
}

impl AdmissionStats {
    pub fn rejection_rate(&self) -> f64 {
        if self.observed_steps == 0 {
            return 0.0;
        }
        self.rejected_cycles as f64 / self.observed_steps as f64
    }
}

/// Blocks admissions from the waiting queue while memory is under pressure
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    threshold: f64,
    rejected_this_cycle: bool,
    stats: AdmissionStats,
}

impl AdmissionGate {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            rejected_this_cycle: false,
            stats: AdmissionStats {
                threshold,
                ..Default::default()
            },
        }
    }

    /// Whether a waiting request may be admitted at the current occupancy.
    /// An empty accelerator always admits, whatever the threshold.
    pub fn permits(&mut self, used: u64, capacity: u64) -> bool {
        if used == 0 {
            return true;
        }
        let ratio = used as f64 / capacity as f64;
        let open = ratio < self.threshold;
        if !open {
            self.rejected_this_cycle = true;
        }
        open
    }

    pub fn observe_step(&mut self, used: u64, capacity: u64, duration: f64) {
        let ratio = used as f64 / capacity as f64;
        self.stats.observed_steps += 1;
        self.stats.max_memory_ratio = self.stats.max_memory_ratio.max(ratio);
        if ratio >= self.threshold {
            self.stats.time_above_threshold += duration;
        }
        if std::mem::take(&mut self.rejected_this_cycle) {
            self.stats.rejected_cycles += 1;
        }
    }

    pub fn stats(&self) -> &AdmissionStats {
        &self.stats
    }
}
