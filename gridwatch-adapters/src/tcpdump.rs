//! Live capture through `tcpdump`.
//!
//! Runs `tcpdump -w -` on an interface for a bounded window, collects the
//! pcap stream from its stdout and decodes it with [`crate::pcap`]. When the
//! window closes tcpdump is killed and whatever was captured so far is
//! returned; a short window is partial data, not a failure.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use gridwatch_adapters::tcpdump::TcpdumpAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = TcpdumpAdapter::builder().interface("eth0").build();
//!     let frames = adapter.capture(Duration::from_secs(10)).await?;
//!     println!("captured {} frames", frames.len());
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use gridwatch_types::RawFrame;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::pcap::decode_pcap;
use crate::AdapterError;

/// Capture filter selecting GOOSE, Sampled Values and MMS, tagged or not.
pub const DEFAULT_FILTER: &str = "ether proto 0x88b8 or ether proto 0x88ba or tcp port 102 \
     or (vlan and (ether proto 0x88b8 or ether proto 0x88ba or tcp port 102))";

/// Adapter capturing frames with tcpdump.
#[derive(Debug, Clone)]
pub struct TcpdumpAdapter {
    program: PathBuf,
    interface: String,
    snaplen: u32,
    filter: String,
}

impl TcpdumpAdapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> TcpdumpAdapterBuilder {
        TcpdumpAdapterBuilder::default()
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Command-line arguments passed to tcpdump.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.interface.clone(),
            "-w".to_string(),
            "-".to_string(),
            "-U".to_string(),
            "-n".to_string(),
            "-s".to_string(),
            self.snaplen.to_string(),
            self.filter.clone(),
        ]
    }

    /// Capture for `window` and return the decoded frames.
    pub async fn capture(&self, window: Duration) -> Result<Vec<RawFrame>, AdapterError> {
        let program = self.program.display().to_string();
        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AdapterError::from_spawn(&program, e))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::Io("tcpdump stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AdapterError::Io("tcpdump stderr not captured".to_string()))?;

        let mut buf = Vec::new();
        let finished_early = tokio::time::timeout(window, stdout.read_to_end(&mut buf))
            .await
            .is_ok();

        if !finished_early {
            debug!(interface = %self.interface, bytes = buf.len(), "capture window closed");
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to stop tcpdump");
            }
        }
        let status = child.wait().await?;

        if finished_early && !status.success() && buf.is_empty() {
            let mut message = String::new();
            let _ = stderr.read_to_string(&mut message).await;
            return Err(classify_failure(message.trim()));
        }

        decode_pcap(&buf)
    }
}

/// Map tcpdump's complaint on stderr to an adapter error.
fn classify_failure(stderr: &str) -> AdapterError {
    if stderr.contains("Permission denied")
        || stderr.contains("Operation not permitted")
        || stderr.contains("permission")
    {
        AdapterError::PermissionDenied(stderr.to_string())
    } else {
        AdapterError::Capture(stderr.to_string())
    }
}

/// Builder for TcpdumpAdapter.
#[derive(Debug, Default)]
pub struct TcpdumpAdapterBuilder {
    program: Option<PathBuf>,
    interface: Option<String>,
    snaplen: Option<u32>,
    filter: Option<String>,
}

impl TcpdumpAdapterBuilder {
    /// Path to the tcpdump binary (default: `tcpdump` from PATH).
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Interface to capture on (default: eth0).
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Bytes captured per frame (default: 65535).
    pub fn snaplen(mut self, snaplen: u32) -> Self {
        self.snaplen = Some(snaplen);
        self
    }

    /// BPF capture filter (default: [`DEFAULT_FILTER`]).
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Build the adapter.
    pub fn build(self) -> TcpdumpAdapter {
        TcpdumpAdapter {
            program: self.program.unwrap_or_else(|| PathBuf::from("tcpdump")),
            interface: self.interface.unwrap_or_else(|| "eth0".to_string()),
            snaplen: self.snaplen.unwrap_or(65535),
            filter: self.filter.unwrap_or_else(|| DEFAULT_FILTER.to_string()),
        }
    }
}
