use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gridwatch::source::Adapter;
use gridwatch::{
    Code, Collector, DiagnosticReport, Engine, LiveAdapter, LogSink, ReplayAdapter, Scope,
    Settings, Timestamp,
};
use gridwatch_adapters::pmc::PmcAdapter;
use gridwatch_adapters::tcpdump::TcpdumpAdapter;
use gridwatch_types::Transport;

/// Exit code for a run aborted with Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

/// Exit code for a run that could not complete.
const EXIT_RUN_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "gridwatch")]
#[command(version, about = "Passive PTP and IEC 61850 diagnostics with graded verdicts")]
struct Args {
    /// Network interface to capture on
    #[arg(short, long, default_value = "eth0")]
    iface: String,

    /// Analysis window in seconds
    #[arg(short, long, default_value = "15")]
    duration: u64,

    /// Print the report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Protocols to analyze
    #[arg(short, long, value_enum, default_value = "all")]
    protocol: ProtocolArg,

    /// Diagnostic log file (appended)
    #[arg(short, long, default_value = "gridwatch.log")]
    log: PathBuf,

    /// TOML file with thresholds and settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recorded clock status log to analyze instead of querying pmc
    #[arg(long)]
    replay_status: Option<PathBuf>,

    /// Recorded pcap file to analyze instead of capturing
    #[arg(long)]
    replay_pcap: Option<PathBuf>,

    /// Path to the linuxptp pmc binary
    #[arg(long, default_value = "pmc")]
    pmc: PathBuf,

    /// ptp4l Unix domain socket
    #[arg(long)]
    uds: Option<PathBuf>,

    /// PTP domain number
    #[arg(long, default_value = "0")]
    domain: u8,

    /// PTP transport (L2, UDPv4, UDPv6) used to recognize the profile
    #[arg(long)]
    transport: Option<Transport>,

    /// Offset warning threshold in nanoseconds
    #[arg(long)]
    offset_warn_ns: Option<i64>,

    /// Offset critical threshold in nanoseconds
    #[arg(long)]
    offset_crit_ns: Option<i64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProtocolArg {
    Ptp,
    Iec61850,
    All,
}

impl From<ProtocolArg> for Scope {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Ptp => Scope::PTP,
            ProtocolArg::Iec61850 => Scope::IEC61850,
            ProtocolArg::All => Scope::ALL,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Diagnostics go to stderr; stdout carries the report.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridwatch=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_RUN_ERROR)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{:#}", e);
            let report = DiagnosticReport::failed(
                Code::ConfigError,
                format!("invalid configuration: {:#}", e),
                Timestamp::now(),
            );
            return emit(&args, &report);
        }
    };
    let scope = Scope::from(args.protocol);
    let adapter = build_adapter(&args, &settings);

    let collector = Collector::new(scope, Duration::from_secs(args.duration))
        .poll_interval(settings.poll_interval())
        .query_timeout(settings.query_timeout());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let collection = runtime.block_on(async {
        tokio::select! {
            collection = collector.collect(adapter.as_ref()) => Some(collection),
            _ = tokio::signal::ctrl_c() => None,
        }
    });
    let Some(collection) = collection else {
        info!("interrupted, no report written");
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    };

    let report = Engine::new(settings.thresholds, scope)
        .transport(settings.transport)
        .analyze(&collection);
    emit(&args, &report)
}

/// Append the report to the log, print it and pick the exit code.
fn emit(args: &Args, report: &DiagnosticReport) -> Result<ExitCode> {
    let mut sink = LogSink::open(&args.log)
        .with_context(|| format!("cannot open log {}", args.log.display()))?;
    sink.write_all(report.findings())
        .with_context(|| format!("cannot write log {}", sink.path().display()))?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print_human(report)?;
    }

    info!(overall = %report.overall(), log = %args.log.display(), "done");
    Ok(ExitCode::from(report.exit_code() as u8))
}

/// Config file and environment, then command-line overrides.
fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(warn) = args.offset_warn_ns {
        settings.thresholds.offset_warning_ns = warn;
    }
    if let Some(crit) = args.offset_crit_ns {
        settings.thresholds.offset_critical_ns = crit;
    }
    if args.transport.is_some() {
        settings.transport = args.transport;
    }
    settings.validate()?;
    Ok(settings)
}

/// Unusable inputs surface as setup errors during collection.
fn build_adapter(args: &Args, settings: &Settings) -> Box<dyn Adapter> {
    if args.replay_status.is_some() || args.replay_pcap.is_some() {
        return Box::new(ReplayAdapter::open(
            args.replay_status.as_deref(),
            args.replay_pcap.as_deref(),
        ));
    }

    let mut pmc = PmcAdapter::builder()
        .program(&args.pmc)
        .domain(args.domain)
        .timeout(settings.query_timeout());
    if let Some(uds) = &args.uds {
        pmc = pmc.uds(uds);
    }
    let tcpdump = TcpdumpAdapter::builder().interface(&args.iface).build();

    Box::new(LiveAdapter::new(pmc.build(), tcpdump))
}

fn print_human(report: &DiagnosticReport) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for line in report.log_lines() {
        writeln!(out, "{}", line)?;
    }
    let counts = report
        .counts()
        .iter()
        .map(|(severity, n)| format!("{} {}", n, severity))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(out, "overall: {} ({})", report.overall(), counts)?;
    out.flush()
}
