use super::summary::MetricsSummary;
use crate::request::RequestTrace;

pub struct MetricsCollector {
    // Latency metrics (simulated time units)
    delay_samples: Vec<f64>,
    waiting_samples: Vec<f64>,
    execution_samples: Vec<f64>,

    // Throughput counters
    decoded_tokens: u64,
    wasted_tokens: u64,
    start_time: f64,

    // Resource utilization (sampled per step)
    memory_utilization_samples: Vec<f64>,
    batch_size_samples: Vec<usize>,

    // Preemption metrics
    swaps_per_request: Vec<u32>,
    sacrifices_per_request: Vec<u32>,

    // Request tracking
    pub completed_requests: u64,
    pub total_requests: u64,
}

impl MetricsCollector {
    pub fn new(start_time: f64) -> Self {
        Self {
            delay_samples: Vec::new(),
            waiting_samples: Vec::new(),
            execution_samples: Vec::new(),
            decoded_tokens: 0,
            wasted_tokens: 0,
            start_time,
            memory_utilization_samples: Vec::new(),
            batch_size_samples: Vec::new(),
            swaps_per_request: Vec::new(),
            sacrifices_per_request: Vec::new(),
            completed_requests: 0,
            total_requests: 0,
        }
    }

    /// Record completion of a request
    pub fn record_request_completion(&mut self, trace: &RequestTrace) {
        if let Some(delay) = trace.total_delay {
            self.delay_samples.push(delay);
        }
        if let Some(waiting) = trace.waiting_time {
            self.waiting_samples.push(waiting);
        }
        if let Some(execution) = trace.execution_time {
            self.execution_samples.push(execution);
        }

        self.decoded_tokens += trace.decode_length;
        self.wasted_tokens += trace.wasted_positions;

        self.swaps_per_request.push(trace.swap_count);
        self.sacrifices_per_request.push(trace.sacrifice_count);

        self.completed_requests += 1;
    }

    /// Record per-step utilization
    pub fn record_iteration_metrics(&mut self, memory_utilization: f64, batch_count: usize) {
        self.memory_utilization_samples.push(memory_utilization);
        self.batch_size_samples.push(batch_count);
    }

    /// Compute final summary statistics
    pub fn compute_summary(&self, current_time: f64) -> MetricsSummary {
        let elapsed = current_time - self.start_time;

        MetricsSummary {
            delay_mean: mean(&self.delay_samples),
            delay_p50: percentile(&self.delay_samples, 0.5),
            delay_p90: percentile(&self.delay_samples, 0.9),
            delay_p99: percentile(&self.delay_samples, 0.99),
            delay_max: max(&self.delay_samples),

            waiting_mean: mean(&self.waiting_samples),
            waiting_p50: percentile(&self.waiting_samples, 0.5),
            waiting_p90: percentile(&self.waiting_samples, 0.9),
            waiting_p99: percentile(&self.waiting_samples, 0.99),

            execution_mean: mean(&self.execution_samples),

            requests_per_sec: rate(self.completed_requests, elapsed),
            tokens_per_sec: rate(self.decoded_tokens, elapsed),
            wasted_tokens: self.wasted_tokens,

            avg_memory_util: mean(&self.memory_utilization_samples),
            avg_batch_size: mean_usize(&self.batch_size_samples),

            total_swaps: self.swaps_per_request.iter().map(|&x| x as u64).sum(),
            swaps_per_request_mean: mean_u32(&self.swaps_per_request),
            total_sacrifices: self.sacrifices_per_request.iter().map(|&x| x as u64).sum(),
            sacrifices_per_request_mean: mean_u32(&self.sacrifices_per_request),

            completed_requests: self.completed_requests,
            total_requests: self.total_requests,
        }
    }
}

fn rate(count: u64, elapsed: f64) -> f64 {
    if elapsed <= 0.0 {
        return 0.0;
    }
    count as f64 / elapsed
}

/// Nearest-rank percentile of unsorted samples
fn percentile(samples: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = samples.iter().filter(|x| !x.is_nan()).copied().collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((sorted.len() as f64 - 1.0) * p) as usize;
    sorted[idx]
}

fn max(samples: &[f64]) -> f64 {
    samples
        .iter()
        .copied()
        .filter(|x| x.is_finite())
        .fold(0.0, f64::max)
}

fn mean(samples: &[f64]) -> f64 {
    let valid: Vec<f64> = samples.iter().filter(|x| x.is_finite()).copied().collect();
    if valid.is_empty() {
        return 0.0;
    }
    valid.iter().sum::<f64>() / valid.len() as f64
}

fn mean_u32(samples: &[u32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&x| x as f64).sum::<f64>() / samples.len() as f64
}

fn mean_usize(samples: &[usize]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&x| x as f64).sum::<f64>() / samples.len() as f64
}
