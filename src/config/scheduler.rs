use crate::scheduler::{AdmissionStrategy, PreemptionMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// What happens to a request evicted from memory: "swap" or "sacrifice"
    #[serde(default)]
    pub preemption_mode: PreemptionMode,

    /// Whether admissions may displace running requests: "conservative" or "aggressive"
    #[serde(default)]
    pub preemption_strategy: AdmissionStrategy,

    /// Under the aggressive strategy, also let waiting admissions displace
    /// running requests (swapped admissions always may)
    #[serde(default)]
    pub allow_waiting_preempt: bool,
}
