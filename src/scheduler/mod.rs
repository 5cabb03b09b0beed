pub mod decision;
pub mod eviction;
pub mod policy;
pub mod scheduler;

pub use decision::{Admission, AdmissionOrigin, AdmittedRequest, CycleOutcome, EvictedRequest};
pub use eviction::{plan_evictions, Victim, VictimAction};
pub use policy::{AdmissionStrategy, PreemptionMode};
pub use scheduler::Scheduler;
