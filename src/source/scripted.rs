//! In-memory adapter with prepared answers, for tests and embedding.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use gridwatch_adapters::AdapterError;
use gridwatch_types::RawFrame;

use super::{Adapter, StatusBlock};

/// Answers each call from a script, in order.
///
/// Once the status script runs out every further query gets
/// [`AdapterError::NoResponse`]; frames are handed out once.
#[derive(Debug)]
pub struct ScriptedAdapter {
    status: Mutex<VecDeque<Result<StatusBlock, AdapterError>>>,
    frames: Mutex<Option<Result<Vec<RawFrame>, AdapterError>>>,
    cycles: usize,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(VecDeque::new()),
            frames: Mutex::new(Some(Ok(Vec::new()))),
            cycles: 0,
        }
    }

    /// Queue a status block.
    pub fn with_status(self, block: StatusBlock) -> Self {
        self.with_status_result(Ok(block))
    }

    /// Queue a failed status query.
    pub fn with_status_error(self, error: AdapterError) -> Self {
        self.with_status_result(Err(error))
    }

    fn with_status_result(mut self, result: Result<StatusBlock, AdapterError>) -> Self {
        self.status
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(result);
        self.cycles += 1;
        self
    }

    pub fn with_frames(self, frames: Vec<RawFrame>) -> Self {
        self.with_frames_result(Ok(frames))
    }

    pub fn with_frames_error(self, error: AdapterError) -> Self {
        self.with_frames_result(Err(error))
    }

    fn with_frames_result(mut self, result: Result<Vec<RawFrame>, AdapterError>) -> Self {
        *self.frames.get_mut().unwrap_or_else(|e| e.into_inner()) = Some(result);
        self
    }
}

impl Default for ScriptedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for ScriptedAdapter {
    async fn fetch_status_block(&self) -> Result<StatusBlock, AdapterError> {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        status.pop_front().unwrap_or(Err(AdapterError::NoResponse))
    }

    async fn fetch_frames(&self, _window: Duration) -> Result<Vec<RawFrame>, AdapterError> {
        let mut frames = self.frames.lock().unwrap_or_else(|e| e.into_inner());
        frames.take().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn description(&self) -> &str {
        "scripted"
    }

    fn recorded_cycles(&self) -> Option<usize> {
        Some(self.cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_types::Timestamp;

    #[test]
    fn test_script_order() {
        let adapter = ScriptedAdapter::new()
            .with_status(StatusBlock::new(Timestamp::from_micros(1), "a"))
            .with_status_error(AdapterError::Timeout)
            .with_status(StatusBlock::new(Timestamp::from_micros(3), "c"));
        assert_eq!(adapter.recorded_cycles(), Some(3));

        tokio_test::block_on(async {
            assert_eq!(adapter.fetch_status_block().await.unwrap().text, "a");
            assert!(matches!(adapter.fetch_status_block().await, Err(AdapterError::Timeout)));
            assert_eq!(adapter.fetch_status_block().await.unwrap().text, "c");
            assert!(matches!(adapter.fetch_status_block().await, Err(AdapterError::NoResponse)));
        });
    }

    #[test]
    fn test_frames_handed_out_once() {
        let adapter = ScriptedAdapter::new().with_frames_error(AdapterError::Capture("eth9".into()));
        tokio_test::block_on(async {
            assert!(adapter.fetch_frames(Duration::ZERO).await.is_err());
            assert!(adapter.fetch_frames(Duration::ZERO).await.unwrap().is_empty());
        });
    }
}
