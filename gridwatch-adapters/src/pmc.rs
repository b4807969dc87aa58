//! linuxptp `pmc` adapter.
//!
//! Queries a running `ptp4l` over its Unix domain socket with the linuxptp
//! management client and returns the raw response text. The text is parsed
//! by the engine, not here.
//!
//! ## Datasets Queried
//!
//! - **TIME_STATUS_NP**: master offset, gmPresent, gmIdentity, rate offset
//! - **CURRENT_DATA_SET**: offsetFromMaster, meanPathDelay
//! - **PORT_DATA_SET**: portState, peerMeanPathDelay
//! - **PARENT_DATA_SET**: grandmasterIdentity, grandmasterClockClass
//! - **TIME_PROPERTIES_DATA_SET**: timeTraceable, frequencyTraceable
//!
//! ## Example
//!
//! ```rust,no_run
//! use gridwatch_adapters::pmc::PmcAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = PmcAdapter::builder()
//!         .uds("/var/run/ptp4l")
//!         .build();
//!
//!     let block = adapter.query().await?;
//!     println!("{}", block);
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::AdapterError;

/// Management datasets requested in every query cycle.
///
/// The last five describe the port configuration used to recognize the
/// PTP profile.
pub const QUERIES: &[&str] = &[
    "GET TIME_STATUS_NP",
    "GET CURRENT_DATA_SET",
    "GET PORT_DATA_SET",
    "GET PARENT_DATA_SET",
    "GET TIME_PROPERTIES_DATA_SET",
    "GET DEFAULT_DATA_SET",
    "GET DOMAIN",
    "GET DELAY_MECHANISM",
    "GET LOG_SYNC_INTERVAL",
    "GET LOG_ANNOUNCE_INTERVAL",
];

/// Adapter running `pmc` once per query cycle.
#[derive(Debug, Clone)]
pub struct PmcAdapter {
    program: PathBuf,
    uds: Option<PathBuf>,
    domain: u8,
    timeout: Duration,
}

impl PmcAdapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> PmcAdapterBuilder {
        PmcAdapterBuilder::default()
    }

    /// Command-line arguments passed to `pmc`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-u".to_string(),
            "-b".to_string(),
            "0".to_string(),
            "-d".to_string(),
            self.domain.to_string(),
        ];
        if let Some(uds) = &self.uds {
            args.push("-s".to_string());
            args.push(uds.display().to_string());
        }
        args.extend(QUERIES.iter().map(|q| q.to_string()));
        args
    }

    /// Run one management query and return the response text.
    ///
    /// A daemon that does not answer yields [`AdapterError::NoResponse`];
    /// a missing `pmc` binary yields [`AdapterError::Unavailable`].
    pub async fn query(&self) -> Result<String, AdapterError> {
        let program = self.program.display().to_string();
        let mut command = Command::new(&self.program);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| AdapterError::from_spawn(&program, e))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(AdapterError::Timeout),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() && stdout.trim().is_empty() {
            if stderr.contains("Permission denied") || stderr.contains("Operation not permitted") {
                return Err(AdapterError::PermissionDenied(stderr.trim().to_string()));
            }
            return Err(AdapterError::Io(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        if !stdout.contains("RESPONSE") {
            debug!(%program, "pmc returned no management response");
            return Err(AdapterError::NoResponse);
        }

        Ok(stdout)
    }
}

/// Builder for PmcAdapter.
#[derive(Debug, Default)]
pub struct PmcAdapterBuilder {
    program: Option<PathBuf>,
    uds: Option<PathBuf>,
    domain: Option<u8>,
    timeout: Option<Duration>,
}

impl PmcAdapterBuilder {
    /// Path to the `pmc` binary (default: `pmc` from PATH).
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// ptp4l Unix domain socket (default: linuxptp's compiled-in path).
    pub fn uds(mut self, uds: impl Into<PathBuf>) -> Self {
        self.uds = Some(uds.into());
        self
    }

    /// PTP domain number (default: 0).
    pub fn domain(mut self, domain: u8) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Per-query timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> PmcAdapter {
        PmcAdapter {
            program: self.program.unwrap_or_else(|| PathBuf::from("pmc")),
            uds: self.uds,
            domain: self.domain.unwrap_or(0),
            timeout: self.timeout.unwrap_or(Duration::from_secs(10)),
        }
    }
}
