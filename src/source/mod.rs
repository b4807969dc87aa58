//! Input abstraction for clock status text and captured frames.
//!
//! The engine never produces its inputs. An [`Adapter`] hands over raw
//! status blocks from the clock daemon and raw frames from the wire, either
//! live ([`LiveAdapter`]), from recorded files ([`ReplayAdapter`]) or from a
//! prepared script ([`ScriptedAdapter`]).

mod live;
mod replay;
mod scripted;

pub use live::LiveAdapter;
pub use replay::{parse_status_file, ReplayAdapter};
pub use scripted::ScriptedAdapter;

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use gridwatch_adapters::AdapterError;
use gridwatch_types::{RawFrame, Timestamp};

/// One clock daemon query cycle, as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBlock {
    pub observed_at: Timestamp,
    pub text: String,
}

impl StatusBlock {
    pub fn new(observed_at: Timestamp, text: impl Into<String>) -> Self {
        Self {
            observed_at,
            text: text.into(),
        }
    }
}

/// Supplier of raw inputs for one analysis run.
///
/// Both operations take `&self` so that status polling and frame capture can
/// run concurrently on the same adapter.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use gridwatch::source::{Adapter, ReplayAdapter};
///
/// # async fn run() -> Result<(), gridwatch_adapters::AdapterError> {
/// let adapter = ReplayAdapter::open(None, Some("substation.pcap".as_ref()));
/// let frames = adapter.fetch_frames(Duration::from_secs(15)).await?;
/// println!("{}: {} frames", adapter.description(), frames.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Adapter: Send + Sync + Debug {
    /// Run one clock daemon query cycle.
    async fn fetch_status_block(&self) -> Result<StatusBlock, AdapterError>;

    /// Capture frames for at most `window`.
    ///
    /// A capture cut short by the window returns the frames seen so far.
    async fn fetch_frames(&self, window: Duration) -> Result<Vec<RawFrame>, AdapterError>;

    /// Returns a human-readable description of the adapter.
    fn description(&self) -> &str;

    /// Number of status blocks a recorded adapter holds.
    ///
    /// Recorded adapters are drained without pacing and their window is
    /// taken from the recorded timestamps. Live adapters return `None`.
    fn recorded_cycles(&self) -> Option<usize> {
        None
    }
}
