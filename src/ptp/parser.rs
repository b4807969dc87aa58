//! Clock daemon status text to [`ClockStatus`].
//!
//! Input is the text of one linuxptp `pmc` query cycle. Each line is a key
//! followed by its value; response headers and keys we do not know are
//! skipped. Every required field must be present once the whole block has
//! been read, otherwise the block is rejected: a missing offset is never
//! treated as zero.

use gridwatch_types::{ClockIdentity, ClockStatus, DelayMechanism, PortState, Timestamp};
use thiserror::Error;

/// 2^41, the scale linuxptp applies to `cumulativeScaledRateOffset`.
const RATE_OFFSET_SCALE: f64 = 2_199_023_255_552.0;

/// A status block that cannot become a [`ClockStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing field {0}")]
    Missing(&'static str),

    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },
}

#[derive(Debug, Default)]
struct Fields {
    offset: Option<i64>,
    mean_delay: Option<i64>,
    peer_delay: Option<i64>,
    freq: Option<i64>,
    port_state: Option<PortState>,
    grandmaster: Option<ClockIdentity>,
    gm_present: Option<bool>,
    gm_clock_class: Option<u8>,
    time_traceable: Option<bool>,
    frequency_traceable: Option<bool>,
    domain: Option<u8>,
    delay_mechanism: Option<DelayMechanism>,
    two_step: Option<bool>,
    log_sync_interval: Option<i8>,
    log_announce_interval: Option<i8>,
}

/// Parse one status block collected at `observed_at`.
///
/// Several datasets repeat a field; the first value wins and later
/// repetitions are not looked at.
pub fn parse_status(block: &str, observed_at: Timestamp) -> Result<ClockStatus, ParseError> {
    let mut f = Fields::default();

    for line in block.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let value = value.trim();

        match key {
            "master_offset" | "offsetFromMaster" => {
                fill(&mut f.offset, || nanoseconds("offset", value))?
            }
            "meanPathDelay" => fill(&mut f.mean_delay, || nanoseconds("meanPathDelay", value))?,
            "peerMeanPathDelay" => {
                fill(&mut f.peer_delay, || nanoseconds("peerMeanPathDelay", value))?
            }
            "freq" | "frequencyAdjustment" => {
                fill(&mut f.freq, || integer("frequency adjustment", value))?
            }
            "cumulativeScaledRateOffset" => fill(&mut f.freq, || rate_offset_ppb(value))?,
            "portState" => fill(&mut f.port_state, || {
                value.parse().map_err(|_| malformed("portState", value))
            })?,
            "gmIdentity" | "grandmasterIdentity" => fill(&mut f.grandmaster, || {
                value.parse().map_err(|_| malformed("grandmaster identity", value))
            })?,
            "gmPresent" => fill(&mut f.gm_present, || boolean("gmPresent", value))?,
            "grandmasterClockClass" => fill(&mut f.gm_clock_class, || {
                narrow("grandmasterClockClass", value)
            })?,
            "timeTraceable" => fill(&mut f.time_traceable, || boolean("timeTraceable", value))?,
            "frequencyTraceable" => fill(&mut f.frequency_traceable, || {
                boolean("frequencyTraceable", value)
            })?,
            "domainNumber" => fill(&mut f.domain, || narrow("domainNumber", value))?,
            "delayMechanism" | "delay_mechanism" => {
                fill(&mut f.delay_mechanism, || delay_mechanism(value))?
            }
            "twoStepFlag" | "twoStep" => fill(&mut f.two_step, || boolean("twoStepFlag", value))?,
            "logSyncInterval" => {
                fill(&mut f.log_sync_interval, || narrow("logSyncInterval", value))?
            }
            "logAnnounceInterval" => fill(&mut f.log_announce_interval, || {
                narrow("logAnnounceInterval", value)
            })?,
            _ => {}
        }
    }

    // In peer-to-peer mode meanPathDelay reads zero and the real figure is
    // the peer delay.
    let mean_path_delay_ns = match (f.mean_delay, f.peer_delay) {
        (Some(0), Some(peer)) => peer,
        (Some(mean), _) => mean,
        (None, Some(peer)) => peer,
        (None, None) => return Err(ParseError::Missing("mean path delay")),
    };

    Ok(ClockStatus {
        observed_at,
        offset_ns: f.offset.ok_or(ParseError::Missing("offset"))?,
        mean_path_delay_ns,
        freq_adj_ppb: f.freq.ok_or(ParseError::Missing("frequency adjustment"))?,
        port_state: f.port_state.ok_or(ParseError::Missing("portState"))?,
        grandmaster: f
            .grandmaster
            .ok_or(ParseError::Missing("grandmaster identity"))?,
        gm_present: f.gm_present,
        gm_clock_class: f.gm_clock_class,
        time_traceable: f.time_traceable,
        frequency_traceable: f.frequency_traceable,
        domain: f.domain,
        delay_mechanism: f.delay_mechanism,
        two_step: f.two_step,
        log_sync_interval: f.log_sync_interval,
        log_announce_interval: f.log_announce_interval,
    })
}

/// Parse into an empty slot; a filled slot skips parsing entirely.
fn fill<T>(
    slot: &mut Option<T>,
    parse: impl FnOnce() -> Result<T, ParseError>,
) -> Result<(), ParseError> {
    if slot.is_none() {
        *slot = Some(parse()?);
    }
    Ok(())
}

fn malformed(field: &'static str, value: &str) -> ParseError {
    ParseError::Malformed {
        field,
        value: value.to_string(),
    }
}

/// Decimal or `0x` hexadecimal integer with an optional sign.
fn integer(field: &'static str, value: &str) -> Result<i64, ParseError> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    if digits.starts_with(['+', '-']) {
        return Err(malformed(field, value));
    }
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse::<i128>(),
    }
    .map_err(|_| malformed(field, value))?;

    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).map_err(|_| malformed(field, value))
}

/// An integer that must fit a narrower field type.
fn narrow<T: TryFrom<i64>>(field: &'static str, value: &str) -> Result<T, ParseError> {
    T::try_from(integer(field, value)?).map_err(|_| malformed(field, value))
}

/// Nanosecond figures; `CURRENT_DATA_SET` prints them with one decimal.
fn nanoseconds(field: &'static str, value: &str) -> Result<i64, ParseError> {
    if let Ok(n) = integer(field, value) {
        return Ok(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
        _ => Err(malformed(field, value)),
    }
}

/// pmc prints the rate offset as a ratio (`+0.000000012`) or, in raw
/// dumps, as the scaled integer.
fn rate_offset_ppb(value: &str) -> Result<i64, ParseError> {
    const FIELD: &str = "cumulativeScaledRateOffset";
    let ratio = if let Ok(raw) = integer(FIELD, value) {
        raw as f64 / RATE_OFFSET_SCALE
    } else {
        match value.parse::<f64>() {
            Ok(f) if f.is_finite() => f,
            _ => return Err(malformed(FIELD, value)),
        }
    };
    Ok((ratio * 1e9).round() as i64)
}

/// Management datasets print the numeric code, configuration dumps the name.
fn delay_mechanism(value: &str) -> Result<DelayMechanism, ParseError> {
    let parsed = match integer("delayMechanism", value) {
        Ok(code) => u8::try_from(code).ok().and_then(DelayMechanism::from_code),
        Err(_) => value.parse().ok(),
    };
    parsed.ok_or_else(|| malformed("delayMechanism", value))
}

fn boolean(field: &'static str, value: &str) -> Result<bool, ParseError> {
    match value {
        "1" | "true" | "True" | "TRUE" => Ok(true),
        "0" | "false" | "False" | "FALSE" => Ok(false),
        _ => Err(malformed(field, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PMC_OUTPUT: &str = "\
sending: GET TIME_STATUS_NP
	001122.fffe.334455-1 seq 0 RESPONSE MANAGEMENT TIME_STATUS_NP
		master_offset              -37
		ingress_time               1700000000123456789
		cumulativeScaledRateOffset +0.000000012
		scaledLastGmPhaseChange    0
		gmTimeBaseIndicator        0
		lastGmPhaseChange          0x0000'0000000000000000.0000
		gmPresent                  true
		gmIdentity                 aabbcc.fffe.ddeeff
	001122.fffe.334455-1 seq 1 RESPONSE MANAGEMENT CURRENT_DATA_SET
		stepsRemoved     1
		offsetFromMaster -37.0
		meanPathDelay    812.0
	001122.fffe.334455-1 seq 2 RESPONSE MANAGEMENT PORT_DATA_SET
		portIdentity            001122.fffe.334455-1
		portState               SLAVE
		logMinDelayReqInterval  0
		peerMeanPathDelay       0
	001122.fffe.334455-1 seq 3 RESPONSE MANAGEMENT PARENT_DATA_SET
		grandmasterIdentity                     aabbcc.fffe.ddeeff
		grandmasterClockClass                   6
	001122.fffe.334455-1 seq 4 RESPONSE MANAGEMENT TIME_PROPERTIES_DATA_SET
		timeTraceable         1
		frequencyTraceable    1
	001122.fffe.334455-1 seq 5 RESPONSE MANAGEMENT DEFAULT_DATA_SET
		twoStepFlag             1
		slaveOnly               1
		clockClass              255
		domainNumber            0
	001122.fffe.334455-1 seq 6 RESPONSE MANAGEMENT DELAY_MECHANISM
		delayMechanism 2
	001122.fffe.334455-1 seq 7 RESPONSE MANAGEMENT LOG_SYNC_INTERVAL
		logSyncInterval -4
	001122.fffe.334455-1 seq 8 RESPONSE MANAGEMENT LOG_ANNOUNCE_INTERVAL
		logAnnounceInterval 0
";

    fn ts() -> Timestamp {
        Timestamp::from_micros(1_700_000_000_000_000)
    }

    #[test]
    fn test_parse_full_pmc_block() {
        let status = parse_status(PMC_OUTPUT, ts()).unwrap();
        assert_eq!(status.offset_ns, -37);
        assert_eq!(status.mean_path_delay_ns, 812);
        assert_eq!(status.freq_adj_ppb, 12);
        assert_eq!(status.port_state, PortState::Slave);
        assert_eq!(status.grandmaster.to_string(), "aabbcc.fffe.ddeeff");
        assert_eq!(status.gm_present, Some(true));
        assert_eq!(status.gm_clock_class, Some(6));
        assert_eq!(status.time_traceable, Some(true));
        assert_eq!(status.frequency_traceable, Some(true));
        assert_eq!(status.domain, Some(0));
        assert_eq!(status.delay_mechanism, Some(DelayMechanism::P2P));
        assert_eq!(status.two_step, Some(true));
        assert_eq!(status.log_sync_interval, Some(-4));
        assert_eq!(status.log_announce_interval, Some(0));
        assert_eq!(status.observed_at, ts());
    }

    #[test]
    fn test_minimal_key_value_block() {
        let block = "offsetFromMaster 120\nmeanPathDelay 900\nfreq -4500\nportState MASTER\ngrandmasterIdentity 001122.fffe.334455\n";
        let status = parse_status(block, ts()).unwrap();
        assert_eq!(status.offset_ns, 120);
        assert_eq!(status.freq_adj_ppb, -4500);
        assert_eq!(status.port_state, PortState::Master);
        assert_eq!(status.gm_present, None);
        assert_eq!(status.delay_mechanism, None);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let block = "vendorSpecificThing banana\noffsetFromMaster 1\nmeanPathDelay 2\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\nanotherKey\n";
        assert!(parse_status(block, ts()).is_ok());
    }

    #[test]
    fn test_missing_offset_is_an_error() {
        let block = "meanPathDelay 2\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\n";
        assert_eq!(
            parse_status(block, ts()).unwrap_err(),
            ParseError::Missing("offset")
        );
    }

    #[test]
    fn test_missing_port_state_is_an_error() {
        let block = "offsetFromMaster 1\nmeanPathDelay 2\nfreq 3\ngmIdentity 001122.fffe.334455\n";
        assert_eq!(
            parse_status(block, ts()).unwrap_err(),
            ParseError::Missing("portState")
        );
    }

    #[test]
    fn test_non_numeric_offset_is_an_error() {
        let block = "master_offset lots\nmeanPathDelay 2\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\n";
        let err = parse_status(block, ts()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { field: "offset", .. }));
    }

    #[test]
    fn test_nan_offset_is_an_error() {
        let block = "master_offset NaN\nmeanPathDelay 2\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\n";
        assert!(parse_status(block, ts()).is_err());
    }

    #[test]
    fn test_unknown_port_state_is_an_error() {
        let block = "master_offset 1\nmeanPathDelay 2\nfreq 3\nportState DANCING\ngmIdentity 001122.fffe.334455\n";
        let err = parse_status(block, ts()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { field: "portState", .. }));
    }

    #[test]
    fn test_peer_delay_used_in_p2p_mode() {
        let block = "master_offset 1\nmeanPathDelay 0.0\npeerMeanPathDelay 640\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\n";
        let status = parse_status(block, ts()).unwrap();
        assert_eq!(status.mean_path_delay_ns, 640);
    }

    #[test]
    fn test_first_offset_wins() {
        let block = "master_offset -5\noffsetFromMaster -9.0\nmeanPathDelay 2\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\n";
        assert_eq!(parse_status(block, ts()).unwrap().offset_ns, -5);
    }

    #[test]
    fn test_raw_scaled_rate_offset() {
        // 2^41 * 1e-6 rounds to 2199023 and reads back as about 1000 ppb.
        let block = "master_offset 0\nmeanPathDelay 2\ncumulativeScaledRateOffset 2199023\nportState SLAVE\ngmIdentity 001122.fffe.334455\n";
        assert_eq!(parse_status(block, ts()).unwrap().freq_adj_ppb, 1000);
    }

    #[test]
    fn test_malformed_repeat_after_valid_value_is_ignored() {
        let block = "master_offset -5\noffsetFromMaster garbage\nmeanPathDelay 2\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\ngmIdentity nope\n";
        let status = parse_status(block, ts()).unwrap();
        assert_eq!(status.offset_ns, -5);
        assert_eq!(status.grandmaster.to_string(), "001122.fffe.334455");
    }

    #[test]
    fn test_hex_integers() {
        let block = "master_offset -0x10\nmeanPathDelay 0x320\nfreq +0x0\nportState SLAVE\ngmIdentity 001122.fffe.334455\ndelayMechanism 0x02\ndomainNumber 0x18\n";
        let status = parse_status(block, ts()).unwrap();
        assert_eq!(status.offset_ns, -16);
        assert_eq!(status.mean_path_delay_ns, 800);
        assert_eq!(status.freq_adj_ppb, 0);
        assert_eq!(status.delay_mechanism, Some(DelayMechanism::P2P));
        assert_eq!(status.domain, Some(24));
    }

    #[test]
    fn test_delay_mechanism_by_name() {
        let block = "master_offset 0\nmeanPathDelay 2\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\ndelay_mechanism Auto\n";
        assert_eq!(
            parse_status(block, ts()).unwrap().delay_mechanism,
            Some(DelayMechanism::Auto)
        );
    }

    #[test]
    fn test_out_of_range_interval_is_an_error() {
        let block = "master_offset 0\nmeanPathDelay 2\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\nlogSyncInterval 300\n";
        let err = parse_status(block, ts()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { field: "logSyncInterval", .. }));
    }

    #[test]
    fn test_extreme_integers() {
        let block = "master_offset -9223372036854775808\nmeanPathDelay 9223372036854775807\nfreq 3\nportState SLAVE\ngmIdentity 001122.fffe.334455\n";
        let status = parse_status(block, ts()).unwrap();
        assert_eq!(status.offset_ns, i64::MIN);
        assert_eq!(status.mean_path_delay_ns, i64::MAX);
    }
}
