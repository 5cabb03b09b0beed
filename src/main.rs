use clap::Parser;
use colored::Colorize;
use decodesim::config::WorkloadConfig;
use decodesim::{
    ArrivalRecord, Config, NullSink, RunReport, SimError, Simulator, StopReason, WorkloadGenerator,
};
use log::LevelFilter;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tabled::{settings::Style, Table, Tabled};

#[derive(Parser, Debug)]
#[command(author, version, about = "Memory-bounded LLM decode scheduling simulator", long_about = None)]
struct Args {
    /// Path to the TOML scenario file
    #[arg(short, long, default_value = "scenario.toml")]
    config: PathBuf,

    /// Minimal output (final metrics only)
    #[arg(short, long)]
    quiet: bool,

    /// Show per-request results and progress
    #[arg(short, long)]
    verbose: bool,

    /// Log every scheduling cycle
    #[arg(long)]
    debug: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Save the run report to a JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum VerbosityLevel {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

impl Args {
    fn verbosity_level(&self) -> VerbosityLevel {
        if self.debug {
            VerbosityLevel::Debug
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else if self.quiet {
            VerbosityLevel::Quiet
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Configuration plus the arrival stream, read from one TOML file
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(flatten)]
    config: Config,

    #[serde(default)]
    arrivals: Vec<ArrivalRecord>,

    /// Used when no explicit arrivals are listed
    #[serde(default)]
    workload: Option<WorkloadConfig>,
}

impl ScenarioFile {
    fn load(path: &Path) -> Result<(Config, Vec<ArrivalRecord>), SimError> {
        let contents = fs::read_to_string(path)?;
        let scenario: ScenarioFile = toml::from_str(&contents)?;
        scenario.config.validate()?;

        let arrivals = match (scenario.arrivals.is_empty(), scenario.workload) {
            (true, Some(workload)) => WorkloadGenerator::new(workload)?.generate(),
            (false, Some(_)) => {
                return Err(SimError::InvalidWorkload(
                    "give either [[arrivals]] or [workload], not both".to_string(),
                ))
            }
            (_, None) => scenario.arrivals,
        };
        Ok((scenario.config, arrivals))
    }
}

#[derive(Tabled)]
struct LatencyRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "p50")]
    p50: String,
    #[tabled(rename = "p90")]
    p90: String,
    #[tabled(rename = "p99")]
    p99: String,
}

#[derive(Tabled)]
struct RequestRow {
    #[tabled(rename = "Id")]
    id: u64,
    #[tabled(rename = "Arrival")]
    arrival: String,
    #[tabled(rename = "Prefill")]
    prefill: u64,
    #[tabled(rename = "Decode")]
    decode: u64,
    #[tabled(rename = "Delay")]
    delay: String,
    #[tabled(rename = "Swaps")]
    swaps: u32,
    #[tabled(rename = "Sacrifices")]
    sacrifices: u32,
    #[tabled(rename = "Wasted")]
    wasted: u64,
}

fn main() {
    let args = Args::parse();
    let verbosity = args.verbosity_level();
    init_logging(verbosity);

    let use_color = !args.no_color;
    if !use_color {
        colored::control::set_override(false);
    }

    if verbosity >= VerbosityLevel::Normal {
        println!("{}", "Decode Scheduling Simulator".bright_cyan().bold());
        println!("Loading scenario from: {:?}\n", args.config);
    }

    let (config, arrivals) = match ScenarioFile::load(&args.config) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Error loading scenario: {}", e);
            std::process::exit(1);
        }
    };

    if verbosity >= VerbosityLevel::Normal {
        print_configuration(&config, arrivals.len());
    }

    let mut simulator = match Simulator::new(config, arrivals, NullSink) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Error creating simulator: {}", e);
            std::process::exit(1);
        }
    };

    let start_time = Instant::now();
    let report = simulator.run();
    let elapsed = start_time.elapsed();

    print_final_metrics(&report, elapsed, verbosity);

    if let Some(output_path) = args.output {
        match save_report_json(&report, &output_path) {
            Ok(_) => {
                if verbosity >= VerbosityLevel::Normal {
                    println!("\nReport saved to: {:?}", output_path);
                }
            }
            Err(e) => {
                eprintln!("Error saving report to JSON: {}", e);
            }
        }
    }

    if report.stop_reason == Some(StopReason::Stalled) {
        std::process::exit(2);
    }
}

/// `RUST_LOG` overrides the level chosen from the command line
fn init_logging(verbosity: VerbosityLevel) {
    let level = match verbosity {
        VerbosityLevel::Quiet => LevelFilter::Warn,
        VerbosityLevel::Normal | VerbosityLevel::Verbose => LevelFilter::Info,
        VerbosityLevel::Debug => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_configuration(config: &Config, num_arrivals: usize) {
    println!("{}", "Configuration:".green().bold());
    println!(
        "  Memory capacity (M_total): {} tokens",
        config.system.memory_capacity
    );
    println!("  Token budget (B):          {} tokens", config.system.token_budget);
    println!(
        "  Step cost:                 {} + {} x tokens",
        config.system.base_latency, config.system.per_token_latency
    );
    println!(
        "  Policy:                    {} / {}{}",
        config.scheduler.preemption_mode,
        config.scheduler.preemption_strategy,
        if config.scheduler.allow_waiting_preempt {
            " (waiting may preempt)"
        } else {
            ""
        }
    );
    if config.admission_control.enabled {
        println!(
            "  Admission threshold:       {:.0}% of memory",
            config.admission_control.threshold * 100.0
        );
    }
    if let Some(truncation) = &config.truncation {
        println!(
            "  Truncation:                at batch {}, {} replacement arrivals",
            truncation.at_batch,
            truncation.arrivals.len()
        );
    }
    println!("  Arrivals:                  {}", num_arrivals);
    println!();
}

fn print_final_metrics(report: &RunReport, real_time: Duration, verbosity: VerbosityLevel) {
    let summary = &report.summary;

    if verbosity == VerbosityLevel::Quiet {
        println!(
            "Simulating... done ({:.1} simulated, {:.2}s real)",
            report.total_time,
            real_time.as_secs_f64()
        );
        println!(
            "Delay:   {:.3} (p50: {:.3}, p99: {:.3})",
            summary.delay_mean, summary.delay_p50, summary.delay_p99
        );
        println!(
            "Waiting: {:.3} (p50: {:.3}, p99: {:.3})",
            summary.waiting_mean, summary.waiting_p50, summary.waiting_p99
        );
        println!("Throughput: {:.3} tok/unit", summary.tokens_per_sec);
        return;
    }

    let status = match report.stop_reason {
        Some(StopReason::Drained) | None => "Simulation Complete".bright_green().bold(),
        Some(StopReason::Stalled) => "Simulation Stalled".bright_red().bold(),
    };
    println!(
        "\n{} ({:.2} simulated over {} batches, {:.2}s real)",
        status,
        report.total_time,
        report.total_batches,
        real_time.as_secs_f64()
    );
    println!("{}", "━".repeat(80).bright_black());

    println!("\n{}", "LATENCY METRICS".yellow().bold());
    let latency_rows = vec![
        LatencyRow {
            metric: "Total delay".to_string(),
            mean: format!("{:.3}", summary.delay_mean),
            p50: format!("{:.3}", summary.delay_p50),
            p90: format!("{:.3}", summary.delay_p90),
            p99: format!("{:.3}", summary.delay_p99),
        },
        LatencyRow {
            metric: "Waiting time".to_string(),
            mean: format!("{:.3}", summary.waiting_mean),
            p50: format!("{:.3}", summary.waiting_p50),
            p90: format!("{:.3}", summary.waiting_p90),
            p99: format!("{:.3}", summary.waiting_p99),
        },
    ];
    println!("{}", Table::new(&latency_rows).with(Style::rounded()));
    println!(
        "  • Execution time: {:.3} mean, delay max {:.3}",
        summary.execution_mean, summary.delay_max
    );

    println!("\n{}", "THROUGHPUT & UTILIZATION".yellow().bold());
    println!("  • Requests/unit time: {:.3}", summary.requests_per_sec);
    println!("  • Tokens/unit time:   {:.3}", summary.tokens_per_sec);
    println!("  • Memory:             {:.1}% avg", summary.avg_memory_util * 100.0);
    println!("  • Batch size:         {:.2} avg", summary.avg_batch_size);

    println!("\n{}", "PREEMPTION".yellow().bold());
    println!(
        "  • Swaps:      {} total ({:.2} per request avg)",
        summary.total_swaps, summary.swaps_per_request_mean
    );
    println!(
        "  • Sacrifices: {} total ({:.2} per request avg), {} tokens wasted",
        summary.total_sacrifices, summary.sacrifices_per_request_mean, summary.wasted_tokens
    );

    if let Some(stats) = &report.admission_control {
        println!("\n{}", "ADMISSION CONTROL".yellow().bold());
        println!("  • Threshold:        {:.0}%", stats.threshold * 100.0);
        println!(
            "  • Rejected cycles:  {} ({:.1}% of steps)",
            stats.rejected_cycles,
            stats.rejection_rate() * 100.0
        );
        println!("  • Peak memory:      {:.1}%", stats.max_memory_ratio * 100.0);
        println!("  • Time at/above:    {:.3}", stats.time_above_threshold);
    }

    if let Some(truncation) = &report.truncation {
        println!("\n{}", "TRUNCATION".yellow().bold());
        println!(
            "  • At batch {} (t={:.3}): dropped {}, injected {}",
            truncation.batch_id, truncation.time, truncation.dropped, truncation.injected
        );
    }

    if verbosity >= VerbosityLevel::Verbose && !report.traces.is_empty() {
        println!("\n{}", "REQUESTS".yellow().bold());
        let rows: Vec<RequestRow> = report
            .traces
            .iter()
            .map(|t| RequestRow {
                id: t.req_id,
                arrival: format!("{:.3}", t.arrival_time),
                prefill: t.prefill_length,
                decode: t.decode_length,
                delay: t
                    .total_delay
                    .map(|d| format!("{:.3}", d))
                    .unwrap_or_else(|| "-".to_string()),
                swaps: t.swap_count,
                sacrifices: t.sacrifice_count,
                wasted: t.wasted_positions,
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }

    println!("\n{}", "SUMMARY".yellow().bold());
    println!(
        "  • Requests: {}/{} completed",
        summary.completed_requests, summary.total_requests
    );
    if !report.stranded.is_empty() {
        println!(
            "  • {} {:?}",
            "Never fit in memory:".red(),
            report.stranded
        );
    }
}

fn save_report_json(report: &RunReport, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}
