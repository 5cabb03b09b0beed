use super::policy::PreemptionMode;
use crate::request::{Request, RequestId};

/// Queue an admitted request was drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOrigin {
    Waiting,
    Swapped,
}

/// A request moved into running during phase 1 of the current cycle
#[derive(Debug, Clone)]
pub struct Admission {
    pub id: RequestId,
    pub origin: AdmissionOrigin,
    /// May push established requests out of memory to stay resident
    pub preemptive: bool,
    /// The request's state before admission, restored on rollback
    pub prior: Request,
}

impl Admission {
    /// Never been resident before this admission
    pub fn is_first_run(&self) -> bool {
        !self.prior.has_run()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmittedRequest {
    pub id: RequestId,
    pub origin: AdmissionOrigin,
    pub decode_position: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvictedRequest {
    pub id: RequestId,
    pub mode: PreemptionMode,
    /// Position at the moment of eviction (before any sacrifice reset)
    pub decode_position: u64,
    pub memory_freed: u64,
}

/// Result of one scheduling cycle
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    /// Admissions that survived phase 2, in admission order
    pub admitted: Vec<AdmittedRequest>,

    /// Established requests pushed out of memory, in eviction order
    pub evicted: Vec<EvictedRequest>,

    /// Admissions rolled back to their origin queue
    pub retracted: Vec<RequestId>,

    /// An admission gate turned away a waiting request
    pub gate_rejected: bool,
}

impl CycleOutcome {
    pub fn is_quiet(&self) -> bool {
        self.admitted.is_empty() && self.evicted.is_empty() && self.retracted.is_empty()
    }
}
