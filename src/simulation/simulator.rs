use super::events::{EventKind, SimEvent};
use super::report::{RunReport, StopReason};
use super::sink::StepSink;
use super::snapshot::StepSnapshot;
use crate::batch::BatchBuilder;
use crate::compute::ComputeEngine;
use crate::config::Config;
use crate::error::Result;
use crate::extension::ExtensionPipeline;
use crate::metrics::{MetricsCollector, MetricsSummary};
use crate::request::{ArrivalQueue, ArrivalRecord, Request, RequestId, RequestTrace};
use crate::scheduler::{AdmissionOrigin, CycleOutcome, PreemptionMode, Scheduler};
use crate::state::{Checkpoint, SystemState};
use log::{debug, info, warn};

/// Discrete batch-time simulation of one accelerator.
///
/// Each call to [`Simulator::step`] ingests arrivals up to the clock, runs one
/// scheduling cycle, executes one batch and advances the clock by the batch
/// duration. Everything observable is pushed into the sink `S`.
pub struct Simulator<S: StepSink> {
    state: SystemState,
    scheduler: Scheduler,
    batch_builder: BatchBuilder,
    compute_engine: ComputeEngine,
    extensions: ExtensionPipeline,
    arrivals: ArrivalQueue,
    metrics: MetricsCollector,
    traces: Vec<RequestTrace>,
    sink: S,

    /// Id of the next batch to execute
    batch_id: u64,
    next_request_id: RequestId,
    log_interval: u64,
    checkpoint_batches: Vec<u64>,
    checkpoints: Vec<Checkpoint>,
    stop_reason: Option<StopReason>,
}

impl<S: StepSink> Simulator<S> {
    pub fn new<I>(config: Config, arrivals: I, sink: S) -> Result<Self>
    where
        I: IntoIterator<Item = ArrivalRecord>,
    {
        config.validate()?;
        let state = SystemState::new(config.system.memory_capacity, config.system.token_budget);
        Self::assemble(&config, state, arrivals, sink)
    }

    /// Continue a run from a checkpoint.
    ///
    /// `arrivals` must hold the arrivals not yet ingested when the checkpoint
    /// was taken. Metrics cover only the resumed part of the run.
    pub fn resume<I>(config: Config, checkpoint: &Checkpoint, arrivals: I, sink: S) -> Result<Self>
    where
        I: IntoIterator<Item = ArrivalRecord>,
    {
        config.validate()?;
        let state = SystemState::restore(
            config.system.memory_capacity,
            config.system.token_budget,
            checkpoint,
        );
        let mut simulator = Self::assemble(&config, state, arrivals, sink)?;
        simulator.batch_id = checkpoint.batch_id;
        simulator.next_request_id = checkpoint.next_request_id;
        simulator.metrics.total_requests = checkpoint.live_count() as u64;
        if let Some(report) = &checkpoint.truncation {
            simulator.extensions.restore_truncation(report.clone());
        }

        info!(
            "Resuming at t={:.3}, batch {}: {} live requests, {} completed",
            checkpoint.time,
            checkpoint.batch_id,
            checkpoint.live_count(),
            checkpoint.completed_count
        );
        Ok(simulator)
    }

    fn assemble<I>(config: &Config, state: SystemState, arrivals: I, sink: S) -> Result<Self>
    where
        I: IntoIterator<Item = ArrivalRecord>,
    {
        let arrivals = ArrivalQueue::new(arrivals)?;
        let extensions = ExtensionPipeline::from_config(config)?;

        let mut checkpoint_batches = config.simulation.checkpoint_batches.clone();
        checkpoint_batches.sort_unstable();
        checkpoint_batches.dedup();

        Ok(Self {
            scheduler: Scheduler::new(config.scheduler.clone()),
            batch_builder: BatchBuilder::new(config.system.token_budget),
            compute_engine: ComputeEngine::new(&config.system),
            extensions,
            arrivals,
            metrics: MetricsCollector::new(state.time()),
            traces: Vec::new(),
            sink,
            batch_id: 0,
            next_request_id: 0,
            log_interval: config.simulation.log_interval,
            checkpoint_batches,
            checkpoints: Vec::new(),
            stop_reason: None,
            state,
        })
    }

    /// Run until every request completes or nothing left can ever run
    pub fn run(&mut self) -> RunReport {
        info!(
            "Starting simulation: {} pending arrivals, M_total={}, B={}, {} / {}",
            self.arrivals.len(),
            self.state.capacity(),
            self.state.token_budget(),
            self.scheduler.preemption_mode(),
            self.scheduler.strategy()
        );

        while self.step() {}

        self.report()
    }

    /// Advance the simulation by one step. Returns false once it has stopped.
    ///
    /// A step with no runnable work jumps the clock to the next arrival
    /// without executing a batch.
    pub fn step(&mut self) -> bool {
        if self.stop_reason.is_some() {
            return false;
        }
        let now = self.state.time();

        // 1. Ingest arrivals up to the current time
        self.ingest_arrivals(now);

        // 2. Extensions that rewrite the rest of the arrival stream; anything
        // they inject that is already due joins this step
        self.extensions
            .before_step(self.batch_id, now, &mut self.arrivals);
        self.ingest_arrivals(now);

        // 3. Nothing can run: jump ahead or stop
        if !self.state.has_schedulable_work() {
            return match self.arrivals.peek_time() {
                Some(next) => {
                    debug!("Idle at t={:.3}, next arrival at t={:.3}", now, next);
                    self.state.advance_clock(next);
                    true
                }
                None => {
                    self.finish();
                    false
                }
            };
        }

        // 4. Schedule
        let outcome = self
            .scheduler
            .schedule(&mut self.state, now, &mut self.extensions);
        self.emit_cycle_events(&outcome, now);

        // 5. Execute one batch
        let plan = self.batch_builder.select(self.state.running());
        debug_assert!(!plan.is_empty());
        let duration = self.compute_engine.calculate_iteration_time(plan.batch_tokens);
        let memory_used = self.state.gpu_memory_used();
        let end = now + duration;

        // 6. Completions
        for id in self.state.advance_batch(&plan.members) {
            if let Some(request) = self.state.complete(id, end) {
                self.record_completion(&request);
            }
        }

        let capacity = self.state.capacity();
        let snapshot = StepSnapshot {
            time: now,
            batch_id: self.batch_id,
            batch_count: plan.batch_count(),
            batch_tokens: plan.batch_tokens,
            running_count: self.state.running().len(),
            waiting_count: self.state.waiting().len(),
            swapped_count: self.state.swapped().len(),
            gpu_memory_used: memory_used,
            completed_count: self.state.completed_count(),
            batch_duration: duration,
            admitted: outcome.admitted.len(),
            swapped_out: count_evicted(&outcome, PreemptionMode::Swap),
            sacrificed: count_evicted(&outcome, PreemptionMode::Sacrifice),
        };
        self.sink.record_step(&snapshot);
        self.metrics
            .record_iteration_metrics(memory_used as f64 / capacity as f64, plan.batch_count());
        self.extensions.after_step(memory_used, capacity, duration);

        // 7. Advance the clock
        self.state.advance_clock(end);
        self.batch_id += 1;

        if self.log_interval > 0 && self.batch_id % self.log_interval == 0 {
            self.log_progress(&snapshot);
        }
        if self.checkpoint_batches.binary_search(&snapshot.batch_id).is_ok() {
            debug!("Checkpoint after batch {}", snapshot.batch_id);
            let checkpoint = self.checkpoint();
            self.checkpoints.push(checkpoint);
        }

        true
    }

    /// Capture the live state between steps
    pub fn checkpoint(&self) -> Checkpoint {
        let (waiting, running, swapped) = self.state.queues();
        Checkpoint {
            time: self.state.time(),
            batch_id: self.batch_id,
            next_request_id: self.next_request_id,
            completed_count: self.state.completed_count(),
            waiting,
            running,
            swapped,
            truncation: self.extensions.truncation_report().cloned(),
        }
    }

    /// Summary of the run so far
    pub fn report(&self) -> RunReport {
        RunReport {
            total_time: self.state.time(),
            total_batches: self.batch_id,
            stop_reason: self.stop_reason,
            summary: self.summary(),
            traces: self.traces.clone(),
            stranded: self.state.unschedulable(),
            admission_control: self.extensions.admission_stats().cloned(),
            truncation: self.extensions.truncation_report().cloned(),
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        self.metrics.compute_summary(self.state.time())
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn time(&self) -> f64 {
        self.state.time()
    }

    pub fn batch_id(&self) -> u64 {
        self.batch_id
    }

    /// Requests ingested since the run began, including those restored from
    /// a checkpoint
    pub fn ingested(&self) -> u64 {
        self.next_request_id
    }

    pub fn pending_arrivals(&self) -> usize {
        self.arrivals.len()
    }

    pub fn traces(&self) -> &[RequestTrace] {
        &self.traces
    }

    /// Checkpoints captured at the configured batches
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn is_finished(&self) -> bool {
        self.stop_reason.is_some()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn ingest_arrivals(&mut self, now: f64) {
        while let Some(record) = self.arrivals.next_if_before(now) {
            let request = Request::new(
                self.next_request_id,
                record.arrival_time,
                record.prefill_length,
                record.decode_length,
            );
            self.next_request_id += 1;
            self.metrics.total_requests += 1;

            self.emit(
                record.arrival_time,
                request.id,
                EventKind::Arrival {
                    prefill_length: request.prefill_length,
                    decode_length: request.decode_length,
                },
            );

            if !self.state.is_schedulable(&request) {
                warn!(
                    "Request {} can never run: peak footprint {} exceeds capacity {}",
                    request.id,
                    request.peak_footprint(),
                    self.state.capacity()
                );
                self.emit(
                    now,
                    request.id,
                    EventKind::Unschedulable {
                        peak_footprint: request.peak_footprint(),
                        capacity: self.state.capacity(),
                    },
                );
            }

            self.state.enqueue(request);
        }
    }

    fn emit_cycle_events(&mut self, outcome: &CycleOutcome, now: f64) {
        for evicted in &outcome.evicted {
            let kind = match evicted.mode {
                PreemptionMode::Swap => EventKind::SwapOut {
                    decode_position: evicted.decode_position,
                    memory_freed: evicted.memory_freed,
                },
                PreemptionMode::Sacrifice => EventKind::Sacrifice {
                    decode_position: evicted.decode_position,
                    memory_freed: evicted.memory_freed,
                },
            };
            self.emit(now, evicted.id, kind);
        }

        for admitted in &outcome.admitted {
            let kind = match admitted.origin {
                AdmissionOrigin::Waiting => EventKind::Admission,
                AdmissionOrigin::Swapped => EventKind::SwapIn {
                    decode_position: admitted.decode_position,
                },
            };
            self.emit(now, admitted.id, kind);
        }
    }

    fn record_completion(&mut self, request: &Request) {
        let trace = request.trace();
        self.metrics.record_request_completion(&trace);
        if let (Some(time), Some(total_delay)) = (trace.completion_time, trace.total_delay) {
            self.emit(time, request.id, EventKind::Completion { total_delay });
        }
        self.traces.push(trace);
    }

    fn emit(&mut self, time: f64, req_id: RequestId, kind: EventKind) {
        let event = SimEvent {
            time,
            batch_id: self.batch_id,
            req_id,
            kind,
        };
        self.sink.record_event(&event);
    }

    fn finish(&mut self) {
        let reason = if self.state.is_drained() {
            StopReason::Drained
        } else {
            warn!(
                "Stopping with {} request(s) that can never fit in memory",
                self.state.unschedulable().len()
            );
            StopReason::Stalled
        };

        info!(
            "Simulation finished at t={:.3} after {} batches: {} completed ({:?})",
            self.state.time(),
            self.batch_id,
            self.state.completed_count(),
            reason
        );
        self.stop_reason = Some(reason);
    }

    fn log_progress(&self, snapshot: &StepSnapshot) {
        info!(
            "[t={:.2}] batch {}: {} running, {} waiting, {} swapped | {}/{} completed | {:.1}% memory | {:.2} tok/unit",
            snapshot.time,
            snapshot.batch_id,
            snapshot.running_count,
            snapshot.waiting_count,
            snapshot.swapped_count,
            self.metrics.completed_requests,
            self.metrics.total_requests,
            snapshot.gpu_memory_used as f64 / self.state.capacity() as f64 * 100.0,
            self.compute_engine
                .decode_throughput(snapshot.batch_count, snapshot.batch_duration),
        );
    }
}

fn count_evicted(outcome: &CycleOutcome, mode: PreemptionMode) -> usize {
    outcome.evicted.iter().filter(|e| e.mode == mode).count()
}
