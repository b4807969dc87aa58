//! Thresholds and run settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then `GRIDWATCH_*` environment variables. The binary applies its own
//! command-line overrides on top before validating.
//!
//! ```toml
//! poll_interval_ms = 1000
//! transport = "L2"
//!
//! [thresholds]
//! offset_warning_ns = 1000
//! offset_critical_ns = 100000
//! mms_report_flood = 50
//! ```
//!
//! Environment variables use `__` between nesting levels, e.g.
//! `GRIDWATCH_THRESHOLDS__OFFSET_WARNING_NS=1000`.

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Result};
use config::{Config, Environment, File};
use gridwatch_types::Transport;
use serde::Deserialize;

/// Thresholds for health rule evaluation.
///
/// These thresholds determine when an observation is considered
/// in warning or critical state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// |offset| above this while SLAVE is a warning.
    pub offset_warning_ns: i64,
    /// |offset| above this while SLAVE is critical.
    pub offset_critical_ns: i64,
    /// Mean path delay above this is a warning.
    pub path_delay_warning_ns: i64,
    /// Total growth of a monotonically rising path delay that counts as drift.
    pub delay_drift_ns: i64,
    /// Nominal power system frequency for Sampled Values.
    pub sv_nominal_frequency_hz: f64,
    /// Nominal samples per cycle (80 for protection, 256 for metering).
    pub sv_nominal_samples_per_cycle: u16,
    /// Allowed deviation from the nominal sample rate, in percent.
    pub sv_rate_tolerance_pct: f64,
    /// More MMS reports/associations than this in one window is a flood.
    pub mms_report_flood: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            offset_warning_ns: 1_000_000,
            offset_critical_ns: 10_000_000,
            path_delay_warning_ns: 5_000_000,
            delay_drift_ns: 1_000,
            sv_nominal_frequency_hz: 50.0,
            sv_nominal_samples_per_cycle: 80,
            sv_rate_tolerance_pct: 10.0,
            mms_report_flood: 100,
        }
    }
}

impl Thresholds {
    /// Reject threshold combinations that cannot be evaluated.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.offset_warning_ns >= 0, "offset_warning_ns must not be negative");
        ensure!(
            self.offset_critical_ns >= self.offset_warning_ns,
            "offset_critical_ns ({}) must be at least offset_warning_ns ({})",
            self.offset_critical_ns,
            self.offset_warning_ns
        );
        ensure!(self.delay_drift_ns >= 0, "delay_drift_ns must not be negative");
        ensure!(
            self.sv_nominal_frequency_hz > 0.0,
            "sv_nominal_frequency_hz must be positive"
        );
        ensure!(
            self.sv_nominal_samples_per_cycle > 0,
            "sv_nominal_samples_per_cycle must be positive"
        );
        ensure!(
            self.sv_rate_tolerance_pct >= 0.0,
            "sv_rate_tolerance_pct must not be negative"
        );
        Ok(())
    }
}

/// Everything a run needs besides its inputs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub thresholds: Thresholds,
    /// Delay between clock daemon queries.
    pub poll_interval_ms: u64,
    /// Timeout for a single clock daemon query.
    pub query_timeout_ms: u64,
    /// PTP transport; inferred from the delay mechanism when unset.
    pub transport: Option<Transport>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            poll_interval_ms: 1000,
            query_timeout_ms: 5000,
            transport: None,
        }
    }
}

impl Settings {
    /// Load settings from an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder.add_source(env).build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.query_timeout_ms > 0, "query_timeout_ms must be positive");
        self.thresholds.validate()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// `GRIDWATCH_` prefix, `__` between nesting levels.
fn environment() -> Environment {
    Environment::with_prefix("GRIDWATCH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
