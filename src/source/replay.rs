//! Recorded inputs: a clock status log and a pcap file.
//!
//! The status log holds one `pmc` response per block. Blocks are separated
//! by lines starting with `---`, optionally followed by the RFC 3339 time
//! the block was collected:
//!
//! ```text
//! --- 2024-03-01T12:00:00Z
//! 	001122.fffe.334455-1 seq 0 RESPONSE MANAGEMENT TIME_STATUS_NP
//! 		master_offset 12
//! 		...
//! --- 2024-03-01T12:00:01Z
//! 		...
//! ```
//!
//! A block without a time is taken to follow the previous block by one
//! second; the first block falls back to the file's modification time.
//!
//! Opening never fails. A recording that cannot be read or parsed is
//! returned as a setup error by the first fetch, so it ends up in the report
//! like any other unavailable input.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use gridwatch_adapters::pcap::read_pcap_file;
use gridwatch_adapters::AdapterError;
use gridwatch_types::{RawFrame, Timestamp};

use super::{Adapter, StatusBlock};
use crate::report::log::parse_timestamp;

const SEPARATOR: &str = "---";
const DEFAULT_SPACING: Duration = Duration::from_secs(1);

/// Split a status log into timestamped blocks.
pub fn parse_status_file(content: &str, fallback: Timestamp) -> Result<Vec<StatusBlock>, AdapterError> {
    let mut blocks = Vec::new();
    let mut current: Option<(Option<Timestamp>, String)> = None;
    let mut previous: Option<Timestamp> = None;

    let mut finish = |entry: Option<(Option<Timestamp>, String)>, blocks: &mut Vec<StatusBlock>| {
        if let Some((ts, text)) = entry {
            if text.trim().is_empty() && ts.is_none() {
                return;
            }
            let observed_at = ts
                .or_else(|| previous.map(|p| p.add(DEFAULT_SPACING)))
                .unwrap_or(fallback);
            previous = Some(observed_at);
            blocks.push(StatusBlock::new(observed_at, text));
        }
    };

    for (number, line) in content.lines().enumerate() {
        if let Some(rest) = line.strip_prefix(SEPARATOR) {
            finish(current.take(), &mut blocks);
            let rest = rest.trim_start_matches('-').trim();
            let ts = if rest.is_empty() {
                None
            } else {
                Some(parse_timestamp(rest).ok_or_else(|| {
                    AdapterError::Parse(format!("line {}: invalid block time {:?}", number + 1, rest))
                })?)
            };
            current = Some((ts, String::new()));
        } else {
            let (_, text) = current.get_or_insert_with(|| (None, String::new()));
            text.push_str(line);
            text.push('\n');
        }
    }
    finish(current.take(), &mut blocks);

    Ok(blocks)
}

#[derive(Debug)]
enum RecordedStatus {
    Missing,
    Failed(AdapterError),
    Blocks(Mutex<VecDeque<StatusBlock>>),
}

/// Replays a recorded status log and capture file.
#[derive(Debug)]
pub struct ReplayAdapter {
    status: RecordedStatus,
    cycles: usize,
    pcap: Option<PathBuf>,
    description: String,
}

impl ReplayAdapter {
    /// Load the status log now; the capture file is read on demand.
    pub fn open(status: Option<&Path>, pcap: Option<&Path>) -> Self {
        let (recorded, cycles) = match status.map(load_status_file) {
            None => (RecordedStatus::Missing, 1),
            Some(Ok(blocks)) => {
                let cycles = blocks.len();
                (RecordedStatus::Blocks(Mutex::new(blocks.into())), cycles)
            }
            Some(Err(e)) => (RecordedStatus::Failed(e), 1),
        };

        let description = match (status, pcap) {
            (Some(s), Some(p)) => format!("replay: {} + {}", s.display(), p.display()),
            (Some(s), None) => format!("replay: {}", s.display()),
            (None, Some(p)) => format!("replay: {}", p.display()),
            (None, None) => "replay: nothing".to_string(),
        };

        Self {
            status: recorded,
            cycles,
            pcap: pcap.map(Path::to_path_buf),
            description,
        }
    }
}

fn load_status_file(path: &Path) -> Result<Vec<StatusBlock>, AdapterError> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AdapterError::Unavailable(format!("{} does not exist", path.display()))
        }
        _ => AdapterError::Io(format!("{}: {}", path.display(), e)),
    })?;
    let fallback = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| Timestamp::from_micros(d.as_micros() as u64))
        .unwrap_or_default();
    parse_status_file(&content, fallback).map_err(|e| match e {
        AdapterError::Parse(detail) => {
            AdapterError::Recording(format!("{}: {}", path.display(), detail))
        }
        other => other,
    })
}

#[async_trait]
impl Adapter for ReplayAdapter {
    async fn fetch_status_block(&self) -> Result<StatusBlock, AdapterError> {
        match &self.status {
            RecordedStatus::Missing => Err(AdapterError::Unavailable(
                "no recorded clock status given".to_string(),
            )),
            RecordedStatus::Failed(e) => Err(e.clone()),
            RecordedStatus::Blocks(queue) => {
                let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
                queue.pop_front().ok_or(AdapterError::NoResponse)
            }
        }
    }

    async fn fetch_frames(&self, _window: Duration) -> Result<Vec<RawFrame>, AdapterError> {
        match &self.pcap {
            Some(path) => read_pcap_file(path),
            None => Err(AdapterError::Unavailable("no recorded capture given".to_string())),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn recorded_cycles(&self) -> Option<usize> {
        Some(self.cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LOG: &str = "\
--- 2024-03-01T12:00:00Z
master_offset 10
portState SLAVE
--- 2024-03-01T12:00:01.500000Z
master_offset 12
portState SLAVE
---
master_offset 14
";

    #[test]
    fn test_parse_status_file() {
        let blocks = parse_status_file(LOG, Timestamp::default()).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].observed_at, Timestamp::from_micros(1_709_294_400_000_000));
        assert_eq!(blocks[0].text, "master_offset 10\nportState SLAVE\n");
        assert_eq!(blocks[1].observed_at, Timestamp::from_micros(1_709_294_401_500_000));
        assert_eq!(blocks[2].observed_at, Timestamp::from_micros(1_709_294_402_500_000));
    }

    #[test]
    fn test_unseparated_file_is_one_block() {
        let fallback = Timestamp::from_micros(42);
        let blocks = parse_status_file("master_offset 1\nportState SLAVE\n", fallback).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].observed_at, fallback);
    }

    #[test]
    fn test_empty_file_has_no_blocks() {
        assert!(parse_status_file("", Timestamp::default()).unwrap().is_empty());
        assert!(parse_status_file("\n\n", Timestamp::default()).unwrap().is_empty());
    }

    #[test]
    fn test_bad_block_time() {
        let err = parse_status_file("--- yesterday\nmaster_offset 1\n", Timestamp::default())
            .unwrap_err();
        assert!(matches!(err, AdapterError::Parse(_)));
    }

    #[test]
    fn test_replay_drains_blocks_then_reports_no_response() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", LOG).unwrap();

        let adapter = ReplayAdapter::open(Some(file.path()), None);
        assert_eq!(adapter.recorded_cycles(), Some(3));
        for _ in 0..3 {
            assert!(tokio_test::block_on(adapter.fetch_status_block()).is_ok());
        }
        assert!(matches!(
            tokio_test::block_on(adapter.fetch_status_block()),
            Err(AdapterError::NoResponse)
        ));
    }

    #[test]
    fn test_missing_inputs_are_unavailable() {
        let adapter = ReplayAdapter::open(None, None);
        assert_eq!(adapter.recorded_cycles(), Some(1));
        let status = tokio_test::block_on(adapter.fetch_status_block()).unwrap_err();
        assert!(matches!(status, AdapterError::Unavailable(_)));
        let frames = tokio_test::block_on(adapter.fetch_frames(Duration::ZERO)).unwrap_err();
        assert!(frames.is_setup());
    }

    #[test]
    fn test_unreadable_recordings_fail_on_fetch() {
        let adapter = ReplayAdapter::open(
            Some(Path::new("/nonexistent/status.log")),
            Some(Path::new("/nonexistent/capture.pcap")),
        );
        assert_eq!(adapter.recorded_cycles(), Some(1));
        let status = tokio_test::block_on(adapter.fetch_status_block()).unwrap_err();
        assert!(status.is_setup());
        assert!(status.to_string().contains("/nonexistent/status.log"));
        assert!(tokio_test::block_on(adapter.fetch_frames(Duration::ZERO)).is_err());
    }

    #[test]
    fn test_unparsable_recording_is_setup_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "--- yesterday\nmaster_offset 1\n").unwrap();

        let adapter = ReplayAdapter::open(Some(file.path()), None);
        let err = tokio_test::block_on(adapter.fetch_status_block()).unwrap_err();
        assert!(matches!(err, AdapterError::Recording(_)));
        assert!(err.is_setup());
    }
}
