//! # gridwatch
//!
//! Passive diagnostics for substation time synchronization and IEC 61850
//! traffic: reads clock daemon telemetry and captured frames, applies
//! protocol health rules and collapses everything into one graded verdict.
//!
//! ## Architecture
//!
//! One run is a single linear pipeline; no stage calls back upstream:
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────────────┐   ┌────────────┐   ┌──────────┐
//! │ source   │──▶│ collect   │──▶│ ptp / iec61850   │──▶│ report     │──▶│ log sink │
//! │(Adapter) │   │(Collector)│   │(parse, evaluate) │   │(Builder)   │   │ / stdout │
//! └──────────┘   └───────────┘   └──────────────────┘   └────────────┘   └──────────┘
//!  Live | Replay | Scripted        engine::Engine
//! ```
//!
//! - **[`source`]**: the [`Adapter`](source::Adapter) trait and its live
//!   (`pmc` + `tcpdump`), replay and scripted implementations
//! - **[`collect`]**: gathers one bounded window of status blocks and frames
//! - **[`ptp`]**: status text parsing and clock health rules
//! - **[`iec61850`]**: frame classification, GOOSE/SV/MMS decoding and
//!   anomaly rules
//! - **[`report`]**: report aggregation, exit codes, the log line format and
//!   JSON output
//! - **[`config`]**: thresholds and run settings
//!
//! ## Verdicts
//!
//! | overall  | exit code |
//! |----------|-----------|
//! | OK       | 0         |
//! | WARNING  | 1         |
//! | CRITICAL | 2         |
//! | ERROR    | 3         |
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # 15 second live run on eth0
//! gridwatch --iface eth0
//!
//! # Offline analysis of recorded inputs, JSON to stdout
//! gridwatch --replay-status pmc.log --replay-pcap capture.pcap --json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::time::Duration;
//! use gridwatch::{Collector, Engine, ReplayAdapter, Scope, Thresholds};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = ReplayAdapter::open(None, Some("capture.pcap".as_ref()));
//! let collection = Collector::new(Scope::IEC61850, Duration::from_secs(15))
//!     .collect(&adapter)
//!     .await;
//!
//! let report = Engine::new(Thresholds::default(), Scope::IEC61850).analyze(&collection);
//! for line in report.log_lines() {
//!     println!("{}", line);
//! }
//! std::process::exit(report.exit_code());
//! # }
//! ```

pub mod collect;
pub mod config;
pub mod engine;
pub mod iec61850;
pub mod ptp;
pub mod report;
pub mod source;

// Re-export main types for convenience
pub use collect::{Collection, Collector};
pub use config::{Settings, Thresholds};
pub use engine::{Engine, Scope};
pub use report::{DiagnosticReport, LogSink, ReportBuilder};
pub use source::{Adapter, LiveAdapter, ReplayAdapter, ScriptedAdapter, StatusBlock};

pub use gridwatch_types::{Code, Finding, Frame, Severity, Timestamp};
