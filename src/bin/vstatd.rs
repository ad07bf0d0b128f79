//! vstatd - Varnish stats collector daemon.
//!
//! Runs `varnishstat` on a fixed interval, keeps the configured stats and
//! writes one record per section to stdout or a file.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use vstat::collector::{Collector, CycleReport, StatSource};
use vstat::config::Config;
use vstat::output::{self, OutputFormat, RecordSink};
use vstat::parser::InputFormat;

/// Varnish stats collector daemon.
#[derive(Parser)]
#[command(name = "vstatd", about = "Varnish stats collector daemon", version)]
struct Args {
    /// TOML configuration file. Command-line flags override its values.
    #[arg(short, long, env = "VSTATD_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stats to collect, comma separated ("*", "MGT.*", "MAIN.uptime").
    #[arg(short, long, value_delimiter = ',')]
    stats: Option<Vec<String>>,

    /// Path to the varnishstat binary.
    #[arg(long, value_name = "PATH")]
    binary: Option<PathBuf>,

    /// Run varnishstat through `sudo -n`.
    #[arg(long)]
    sudo: bool,

    /// varnishd instance name (passed as `varnishstat -n`).
    #[arg(short = 'n', long, value_name = "NAME")]
    instance: Option<String>,

    /// Maximum run time of one varnishstat call (e.g. "1s", "500ms").
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Collection interval (e.g. "10s", "1m").
    #[arg(short, long, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// varnishstat output to request: json (-j) or text (-1).
    #[arg(long, value_name = "FORMAT")]
    input_format: Option<InputFormat>,

    /// Record encoding: line (InfluxDB line protocol) or json.
    #[arg(long, value_name = "FORMAT")]
    output_format: Option<OutputFormat>,

    /// Output file ("-" for stdout).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Extra tag added to every record, as KEY=VALUE. Repeatable.
    #[arg(short, long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    tags: Vec<(String, String)>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Parses a `KEY=VALUE` tag argument.
fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid tag '{}', expected KEY=VALUE", s)),
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr so stdout stays free for records.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["vstatd", "vstat"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the effective configuration: file (or defaults), then flags.
fn build_config(args: &Args) -> Result<Config, String> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).map_err(|e| e.to_string())?,
        None => Config::default(),
    };

    if let Some(stats) = &args.stats {
        config.stats = stats.clone();
    }
    if let Some(binary) = &args.binary {
        config.binary = binary.clone();
    }
    if args.sudo {
        config.use_sudo = true;
    }
    if let Some(instance) = &args.instance {
        config.instance_name = Some(instance.clone());
    }
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    if let Some(format) = args.input_format {
        config.input_format = format;
    }
    if let Some(format) = args.output_format {
        config.output_format = format;
    }
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    for (key, value) in &args.tags {
        config.tags.insert(key.clone(), value.clone());
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Describes a cycle report for logging.
fn describe_report(report: &CycleReport) -> String {
    let sections: Vec<&str> = report.records.iter().map(|r| r.section()).collect();
    format!(
        "{} records, {} fields ({} of {} stats selected){}{}",
        report.records.len(),
        report.field_count(),
        report.stats_selected,
        report.stats_seen,
        if sections.is_empty() { "" } else { ": " },
        sections.join(", ")
    )
}

/// Runs one cycle and hands the records to the sink.
///
/// Returns `false` when the cycle failed.
fn run_cycle<S: StatSource>(
    collector: &Collector<S>,
    sink: &mut dyn RecordSink,
    cycle: u64,
) -> bool {
    match collector.collect() {
        Ok(report) => {
            info!("Cycle #{}: {}", cycle, describe_report(&report));
            if report.stats_selected == 0 {
                warn!("No stats matched the configured patterns");
            }
            if !report.diagnostics.is_empty() {
                warn!("{} stats skipped", report.diagnostics.len());
            }
            if let Err(e) = sink.write(&report.records) {
                error!("Failed to write records: {}", e);
                return false;
            }
            true
        }
        Err(e) => {
            error!("Cycle #{} failed: {}", cycle, e);
            false
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.print_config {
        print!("{}", config.to_toml());
        return ExitCode::SUCCESS;
    }

    info!("vstatd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}, timeout={}, stats=[{}]",
        humantime::format_duration(config.interval),
        humantime::format_duration(config.timeout),
        config.stats.join(", ")
    );

    let source = config.stat_source();
    debug!("Source command: {}", source.command_line().join(" "));
    let collector = Collector::new(source, config.collector_config());

    let mut sink = match output::open(config.output_format, config.output.as_deref()) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Failed to open output: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.once {
        return if run_cycle(&collector, sink.as_mut(), 1) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting collection loop");

    let mut cycle: u64 = 0;
    let mut failures: u64 = 0;

    while running.load(Ordering::SeqCst) {
        cycle += 1;
        if !run_cycle(&collector, sink.as_mut(), cycle) {
            failures += 1;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = config.interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutdown complete after {} cycles ({} failed)", cycle, failures);
    ExitCode::SUCCESS
}
