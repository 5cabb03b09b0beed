use crate::config::TruncationConfig;
use crate::error::Result;
use crate::request::ArrivalQueue;
use log::info;
use serde::{Deserialize, Serialize};

/// What happened when the arrival stream was cut over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruncationReport {
    pub batch_id: u64,
    pub time: f64,
    /// Pending arrivals discarded
    pub dropped: usize,
    /// Arrivals queued in their place
    pub injected: usize,
    /// Arrival window of the injected stream, in absolute time
    pub window_start: Option<f64>,
    pub window_end: Option<f64>,
}

/// Discards the remaining arrival stream at a given batch and injects a
/// replacement stream starting at the current clock
#[derive(Debug, Clone)]
pub struct LoadTruncation {
    at_batch: u64,
    replacement: ArrivalQueue,
    report: Option<TruncationReport>,
}

impl LoadTruncation {
    pub fn new(config: &TruncationConfig) -> Result<Self> {
        Ok(Self {
            at_batch: config.at_batch,
            replacement: ArrivalQueue::new(config.arrivals.iter().copied())?,
            report: None,
        })
    }

    /// Apply the cut-over once the simulation reaches the configured batch
    pub fn before_step(&mut self, batch_id: u64, now: f64, arrivals: &mut ArrivalQueue) {
        if self.report.is_some() || batch_id < self.at_batch {
            return;
        }

        let dropped = arrivals.replace(&self.replacement, now);
        let report = TruncationReport {
            batch_id,
            time: now,
            dropped,
            injected: arrivals.len(),
            window_start: arrivals.peek_time(),
            window_end: arrivals.iter().last().map(|r| r.arrival_time),
        };
        info!(
            "Truncated arrivals at batch {} (t={:.3}): dropped {}, injected {}",
            batch_id, now, report.dropped, report.injected
        );
        self.report = Some(report);
    }

    /// Mark the cut-over as already applied, as in a run resumed past it
    pub fn restore(&mut self, report: TruncationReport) {
        self.report = Some(report);
    }

    pub fn report(&self) -> Option<&TruncationReport> {
        self.report.as_ref()
    }
}
