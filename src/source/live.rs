//! Live inputs: linuxptp `pmc` and `tcpdump`.

use std::time::Duration;

use async_trait::async_trait;
use gridwatch_adapters::pmc::PmcAdapter;
use gridwatch_adapters::tcpdump::TcpdumpAdapter;
use gridwatch_adapters::AdapterError;
use gridwatch_types::{RawFrame, Timestamp};
use tracing::debug;

use super::{Adapter, StatusBlock};

/// Queries the running clock daemon and captures on a network interface.
#[derive(Debug)]
pub struct LiveAdapter {
    pmc: PmcAdapter,
    tcpdump: TcpdumpAdapter,
    description: String,
}

impl LiveAdapter {
    pub fn new(pmc: PmcAdapter, tcpdump: TcpdumpAdapter) -> Self {
        let description = format!("live: {}", tcpdump.interface());
        Self {
            pmc,
            tcpdump,
            description,
        }
    }
}

#[async_trait]
impl Adapter for LiveAdapter {
    async fn fetch_status_block(&self) -> Result<StatusBlock, AdapterError> {
        let observed_at = Timestamp::now();
        let text = self.pmc.query().await?;
        debug!(bytes = text.len(), "clock status received");
        Ok(StatusBlock::new(observed_at, text))
    }

    async fn fetch_frames(&self, window: Duration) -> Result<Vec<RawFrame>, AdapterError> {
        let frames = self.tcpdump.capture(window).await?;
        debug!(interface = self.tcpdump.interface(), frames = frames.len(), "capture finished");
        Ok(frames)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_names_interface() {
        let adapter = LiveAdapter::new(
            PmcAdapter::builder().build(),
            TcpdumpAdapter::builder().interface("enp3s0").build(),
        );
        assert_eq!(adapter.description(), "live: enp3s0");
        assert!(adapter.recorded_cycles().is_none());
    }

    #[test]
    fn test_missing_tools_are_setup_errors() {
        let adapter = LiveAdapter::new(
            PmcAdapter::builder().program("/nonexistent/pmc").build(),
            TcpdumpAdapter::builder().program("/nonexistent/tcpdump").build(),
        );
        let status = tokio_test::block_on(adapter.fetch_status_block()).unwrap_err();
        assert!(status.is_setup());
        let frames =
            tokio_test::block_on(adapter.fetch_frames(Duration::from_millis(10))).unwrap_err();
        assert!(frames.is_setup());
    }
}
