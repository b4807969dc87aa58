//! PTP status parsing and health evaluation.

mod health;
mod parser;
mod profile;

pub use health::{evaluate, evaluate_profile};
pub use parser::{parse_status, ParseError};
pub use profile::{Expectations, Profile};

use gridwatch_types::{ClockStatus, Code, Finding, Timestamp};

/// Parse a batch of status blocks in collection order.
///
/// Blocks that fail to parse become `PTP_PARSE_ERROR` warnings and are left
/// out of the snapshot sequence.
pub fn parse_all<'a, I>(blocks: I) -> (Vec<ClockStatus>, Vec<Finding>)
where
    I: IntoIterator<Item = (&'a str, Timestamp)>,
{
    let mut snapshots = Vec::new();
    let mut findings = Vec::new();

    for (text, observed_at) in blocks {
        match parse_status(text, observed_at) {
            Ok(status) => snapshots.push(status),
            Err(e) => findings.push(Finding::warning(
                Code::PtpParseError,
                format!("unusable clock status: {}", e),
                observed_at,
            )),
        }
    }

    (snapshots, findings)
}
