pub mod batch;
pub mod compute;
pub mod config;
pub mod error;
pub mod extension;
pub mod metrics;
pub mod request;
pub mod scheduler;
pub mod simulation;
pub mod state;

// Re-export key types
pub use batch::{BatchBuilder, BatchPlan};
pub use compute::ComputeEngine;
pub use config::Config;
pub use error::{Result, SimError};
pub use extension::{ExtensionPipeline, SchedulerExtension};
pub use metrics::{MetricsCollector, MetricsSummary};
pub use request::{ArrivalRecord, Request, RequestId, RequestStatus, RequestTrace, WorkloadGenerator};
pub use scheduler::{AdmissionStrategy, PreemptionMode, Scheduler};
pub use simulation::{
    EventKind, NullSink, RecordingSink, RunReport, SimEvent, Simulator, StepSink, StepSnapshot,
    StopReason,
};
pub use state::{Checkpoint, SystemState};
