//! The diagnostic log line format and its append-only sink.
//!
//! One finding per line, fields separated by single spaces:
//!
//! ```text
//! 2024-03-01T12:00:00.250000Z CRITICAL GOOSE_SEQ_ANOMALY gcb01: sqNum jumped from 3 to 5 at stNum 7
//! ```
//!
//! The message is free text and always last; newlines inside it are
//! flattened so a line is always one finding.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use gridwatch_types::{Code, Finding, Severity, Timestamp};
use thiserror::Error;

/// A log line that does not follow the line format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("line has fewer than three fields")]
    TooShort,

    #[error("invalid timestamp {0:?}")]
    Timestamp(String),

    #[error("unknown severity {0:?}")]
    Severity(String),

    #[error("unknown code {0:?}")]
    Code(String),
}

/// RFC 3339 UTC with microsecond precision.
pub fn format_timestamp(ts: Timestamp) -> String {
    let micros = i64::try_from(ts.as_micros()).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp_micros(micros)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let dt = DateTime::parse_from_rfc3339(s).ok()?;
    let micros = u64::try_from(dt.timestamp_micros()).ok()?;
    Some(Timestamp::from_micros(micros))
}

/// Render one finding as a log line, without the trailing newline.
pub fn format_line(finding: &Finding) -> String {
    let message: String = finding
        .message
        .split(['\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{} {} {} {}",
        format_timestamp(finding.timestamp),
        finding.severity,
        finding.code,
        message
    )
    .trim_end()
    .to_string()
}

/// Recover a finding from a log line.
pub fn parse_line(line: &str) -> Result<Finding, LineError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut fields = line.splitn(4, ' ');
    let (Some(ts), Some(severity), Some(code)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(LineError::TooShort);
    };
    let message = fields.next().unwrap_or_default();

    let timestamp = parse_timestamp(ts).ok_or_else(|| LineError::Timestamp(ts.to_string()))?;
    let severity: Severity = severity
        .parse()
        .map_err(|_| LineError::Severity(severity.to_string()))?;
    let code: Code = code.parse().map_err(|_| LineError::Code(code.to_string()))?;

    Ok(Finding::new(severity, code, message, timestamp))
}

/// Append-only diagnostic log file.
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append findings, one line each, and flush.
    pub fn write_all<'a>(&mut self, findings: impl IntoIterator<Item = &'a Finding>) -> io::Result<()> {
        for finding in findings {
            writeln!(self.writer, "{}", format_line(finding))?;
        }
        self.writer.flush()
    }
}
