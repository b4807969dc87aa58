//! Gathers one window of inputs from an [`Adapter`].
//!
//! Clock status polling and frame capture run side by side on the same
//! task. Both are bounded by the analysis window: when it closes, whatever
//! has been gathered so far is the input. Transient query failures cost one
//! cycle; setup failures end collection for that input and are carried as
//! ERROR findings.

use std::time::Duration;

use gridwatch_adapters::AdapterError;
use gridwatch_types::{AnalysisWindow, Code, Finding, RawFrame, Timestamp};
use tracing::{debug, info, warn};

use crate::engine::Scope;
use crate::source::{Adapter, StatusBlock};

/// Everything gathered for one run, handed immutably to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub window: AnalysisWindow,
    pub status_blocks: Vec<StatusBlock>,
    pub frames: Vec<RawFrame>,
    /// ERROR findings for inputs that could not be set up at all.
    pub setup_failures: Vec<Finding>,
}

/// Drives an adapter for one analysis window.
#[derive(Debug, Clone)]
pub struct Collector {
    scope: Scope,
    duration: Duration,
    poll_interval: Duration,
    query_timeout: Duration,
}

impl Collector {
    pub fn new(scope: Scope, duration: Duration) -> Self {
        Self {
            scope,
            duration,
            poll_interval: Duration::from_secs(1),
            query_timeout: Duration::from_secs(5),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Extra time granted to the last status query after the window closes.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Number of status query cycles in a live window.
    fn live_cycles(&self) -> usize {
        if self.poll_interval.is_zero() {
            return 1;
        }
        let cycles = self.duration.as_millis() / self.poll_interval.as_millis().max(1);
        usize::try_from(cycles).unwrap_or(usize::MAX).max(1)
    }

    pub async fn collect(&self, adapter: &dyn Adapter) -> Collection {
        let recorded = adapter.recorded_cycles();
        let started = Timestamp::now();
        info!(source = adapter.description(), duration = ?self.duration, "collecting");

        let mut status_blocks = Vec::new();
        let status = async {
            if self.scope.ptp {
                self.poll_status(adapter, recorded, &mut status_blocks).await
            } else {
                Ok(())
            }
        };
        let frames = async {
            if self.scope.iec61850 {
                self.capture(adapter).await
            } else {
                Ok(Vec::new())
            }
        };
        let (status, frames) = tokio::join!(status, frames);

        let mut setup_failures = Vec::new();
        if let Err(e) = status {
            setup_failures.push(Finding::error(
                Code::PtpSetupError,
                format!("clock status unavailable: {}", e),
                started,
            ));
        }
        let frames = frames.unwrap_or_else(|e| {
            setup_failures.push(Finding::error(
                Code::CaptureSetupError,
                format!("frame capture unavailable: {}", e),
                started,
            ));
            Vec::new()
        });

        let window = match recorded {
            Some(_) => recorded_window(&status_blocks, &frames).unwrap_or_else(|| {
                let now = Timestamp::now();
                AnalysisWindow::new(now, now)
            }),
            None => AnalysisWindow::new(started, Timestamp::now()),
        };

        debug!(
            status_blocks = status_blocks.len(),
            frames = frames.len(),
            setup_failures = setup_failures.len(),
            "collection finished"
        );

        Collection {
            window,
            status_blocks,
            frames,
            setup_failures,
        }
    }

    async fn poll_status(
        &self,
        adapter: &dyn Adapter,
        recorded: Option<usize>,
        blocks: &mut Vec<StatusBlock>,
    ) -> Result<(), AdapterError> {
        if let Some(cycles) = recorded {
            for _ in 0..cycles {
                record_status(adapter.fetch_status_block().await, blocks)?;
            }
            return Ok(());
        }

        let cycles = self.live_cycles();
        let limit = self.duration + self.query_timeout;
        let polling = async {
            for cycle in 0..cycles {
                record_status(adapter.fetch_status_block().await, blocks)?;
                if cycle + 1 < cycles {
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
            Ok::<(), AdapterError>(())
        };

        match tokio::time::timeout(limit, polling).await {
            Ok(result) => result,
            Err(_) => {
                warn!("status polling cut short by the analysis window");
                Ok(())
            }
        }
    }

    async fn capture(&self, adapter: &dyn Adapter) -> Result<Vec<RawFrame>, AdapterError> {
        match adapter.fetch_frames(self.duration).await {
            Ok(frames) => Ok(frames),
            Err(AdapterError::Timeout) => {
                warn!("capture timed out without data");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

/// Keep a status block, skip a transient failure, propagate a setup failure.
fn record_status(
    result: Result<StatusBlock, AdapterError>,
    blocks: &mut Vec<StatusBlock>,
) -> Result<(), AdapterError> {
    match result {
        Ok(block) => {
            blocks.push(block);
            Ok(())
        }
        Err(e) if e.is_setup() => Err(e),
        Err(e) => {
            warn!(error = %e, "status query failed");
            Ok(())
        }
    }
}

/// The span covered by recorded inputs.
fn recorded_window(blocks: &[StatusBlock], frames: &[RawFrame]) -> Option<AnalysisWindow> {
    let times = blocks
        .iter()
        .map(|b| b.observed_at)
        .chain(frames.iter().map(|f| f.timestamp));
    let (start, end) = times.fold(None, |span: Option<(Timestamp, Timestamp)>, ts| match span {
        None => Some((ts, ts)),
        Some((start, end)) => Some((start.min(ts), end.max(ts))),
    })?;
    Some(AnalysisWindow::new(start, end))
}
