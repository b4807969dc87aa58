//! Capture and observation timestamps.
//!
//! Microseconds since the Unix epoch are the canonical unit: pcap records
//! carry microsecond resolution and the value fits in a u64 for the
//! foreseeable future.

use core::time::Duration;

/// Wall-clock instant in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create from microseconds since the epoch.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Create from a seconds/microseconds pair, as stored in pcap records.
    pub const fn from_secs_micros(secs: u64, micros: u32) -> Self {
        Self(secs * 1_000_000 + micros as u64)
    }

    /// The current wall-clock time.
    #[cfg(feature = "std")]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Self(d.as_micros() as u64))
            .unwrap_or_default()
    }

    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    /// Shift forward by a duration.
    pub fn add(&self, d: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(d.as_micros() as u64))
    }
}

/// The bounded time window one run analyzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl AnalysisWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Window length, zero if `end` precedes `start`.
    pub fn duration(&self) -> Duration {
        self.end.saturating_since(self.start)
    }
}
