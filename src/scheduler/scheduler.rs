use super::decision::{Admission, AdmissionOrigin, AdmittedRequest, CycleOutcome, EvictedRequest};
use super::eviction::{plan_evictions, Victim, VictimAction};
use super::policy::{AdmissionStrategy, PreemptionMode};
use crate::config::SchedulerConfig;
use crate::extension::ExtensionPipeline;
use crate::request::{Request, RequestId};
use crate::state::SystemState;
use log::debug;

/// Phase 1 result
#[derive(Debug, Default)]
pub struct AdmissionRound {
    pub admissions: Vec<Admission>,
    pub gate_rejected: bool,
}

/// Three-phase scheduler: admission, memory-pressure eviction, placement
pub struct Scheduler {
    config: SchedulerConfig,

    /// Current cycle number
    iteration: u64,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            iteration: 0,
        }
    }

    pub fn preemption_mode(&self) -> PreemptionMode {
        self.config.preemption_mode
    }

    pub fn strategy(&self) -> AdmissionStrategy {
        self.config.preemption_strategy
    }

    /// Main scheduling function - called once per step, before batching.
    /// On return the running set fits in memory.
    pub fn schedule(
        &mut self,
        state: &mut SystemState,
        now: f64,
        extensions: &mut ExtensionPipeline,
    ) -> CycleOutcome {
        self.iteration += 1;

        let round = self.admit(state, now, extensions);
        let victims = self.select_victims(state, &round.admissions);
        let outcome = self.place(state, round, &victims, now);

        if !outcome.is_quiet() {
            debug!(
                "cycle {} t={:.3}: admitted {}, evicted {}, retracted {}, memory {}/{}",
                self.iteration,
                now,
                outcome.admitted.len(),
                outcome.evicted.len(),
                outcome.retracted.len(),
                state.gpu_memory_used(),
                state.capacity()
            );
        }
        outcome
    }

    /// Phase 1: move every eligible swapped request, then every eligible
    /// waiting request, into running.
    ///
    /// Memory is not checked here. Requests that could never fit are skipped
    /// and stay queued. Admissions from waiting stop as soon as an extension
    /// gate refuses one.
    pub fn admit(
        &self,
        state: &mut SystemState,
        now: f64,
        extensions: &mut ExtensionPipeline,
    ) -> AdmissionRound {
        let mut round = AdmissionRound::default();

        let swapped: Vec<RequestId> = state
            .swapped()
            .iter()
            .filter(|r| state.is_schedulable(r))
            .map(|r| r.id)
            .collect();
        for id in swapped {
            if let Some(prior) = state.admit(id, now) {
                round.admissions.push(self.record(prior, AdmissionOrigin::Swapped));
            }
        }

        let waiting: Vec<RequestId> = state
            .waiting()
            .iter()
            .filter(|r| state.is_schedulable(r))
            .map(|r| r.id)
            .collect();
        for id in waiting {
            if !extensions.permits_waiting_admission(state.gpu_memory_used(), state.capacity()) {
                round.gate_rejected = true;
                break;
            }
            if let Some(prior) = state.admit(id, now) {
                round.admissions.push(self.record(prior, AdmissionOrigin::Waiting));
            }
        }

        round
    }

    /// Phase 2: choose victims until the running set fits in memory
    pub fn select_victims(&self, state: &SystemState, admissions: &[Admission]) -> Vec<Victim> {
        plan_evictions(state.running(), admissions, state.capacity())
    }

    /// Phase 3: apply the victims and settle every request in its queue
    pub fn place(
        &self,
        state: &mut SystemState,
        round: AdmissionRound,
        victims: &[Victim],
        now: f64,
    ) -> CycleOutcome {
        let mode = self.config.preemption_mode;
        let mut outcome = CycleOutcome {
            gate_rejected: round.gate_rejected,
            ..Default::default()
        };
        let mut evicted = Vec::new();

        for victim in victims {
            match victim.action {
                VictimAction::Retract => {
                    if state.retract(victim.id) {
                        outcome.retracted.push(victim.id);
                    }
                }
                VictimAction::Evict => {
                    let position = state
                        .running()
                        .iter()
                        .find(|r| r.id == victim.id)
                        .map(|r| (r.decode_position, r.footprint()));
                    if let (Some((decode_position, memory_freed)), Some(request)) =
                        (position, state.evict(victim.id, mode, now))
                    {
                        outcome.evicted.push(EvictedRequest {
                            id: victim.id,
                            mode,
                            decode_position,
                            memory_freed,
                        });
                        evicted.push(request);
                    }
                }
            }
        }

        let mut restored = Vec::new();
        for admission in round.admissions {
            if outcome.retracted.contains(&admission.id) {
                restored.push(admission.prior);
            } else {
                outcome.admitted.push(AdmittedRequest {
                    id: admission.id,
                    origin: admission.origin,
                    decode_position: admission.prior.decode_position,
                });
            }
        }

        state.restore_retracted(restored);
        state.place_evicted_batch(evicted, mode);
        outcome
    }

    /// Whether an admission from `origin` may displace established requests
    fn is_preemptive(&self, origin: AdmissionOrigin) -> bool {
        match self.config.preemption_strategy {
            AdmissionStrategy::Conservative => false,
            AdmissionStrategy::Aggressive => match origin {
                AdmissionOrigin::Swapped => true,
                AdmissionOrigin::Waiting => {
                    self.config.allow_waiting_preempt
                        || self.config.preemption_mode == PreemptionMode::Sacrifice
                }
            },
        }
    }

    fn record(&self, prior: Request, origin: AdmissionOrigin) -> Admission {
        Admission {
            id: prior.id,
            origin,
            preemptive: self.is_preemptive(origin),
            prior,
        }
    }
}
