use super::events::SimEvent;
use super::snapshot::StepSnapshot;

/// Receives everything the simulation emits while it runs
pub trait StepSink {
    fn record_step(&mut self, snapshot: &StepSnapshot);

    fn record_event(&mut self, _event: &SimEvent) {}
}

/// Keeps every snapshot and event in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub steps: Vec<StepSnapshot>,
    pub events: Vec<SimEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events concerning one request, in emission order
    pub fn events_for(&self, req_id: u64) -> impl Iterator<Item = &SimEvent> {
        self.events.iter().filter(move |e| e.req_id == req_id)
    }
}

impl StepSink for RecordingSink {
    fn record_step(&mut self, snapshot: &StepSnapshot) {
        self.steps.push(snapshot.clone());
    }

    fn record_event(&mut self, event: &SimEvent) {
        self.events.push(event.clone());
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StepSink for NullSink {
    fn record_step(&mut self, _snapshot: &StepSnapshot) {}
}
