pub mod events;
pub mod report;
pub mod simulator;
pub mod sink;
pub mod snapshot;

#[cfg(test)]
mod scenarios;

pub use events::{EventKind, SimEvent};
pub use report::{RunReport, StopReason};
pub use simulator::Simulator;
pub use sink::{NullSink, RecordingSink, StepSink};
pub use snapshot::StepSnapshot;
