//! Severity levels, protocol groups and stable diagnostic codes.

use core::fmt;
use core::str::FromStr;

/// Severity of a diagnostic finding.
///
/// Ordered so that `max()` over a set of findings yields the overall verdict.
/// `Error` is reserved for setup conditions (no data, adapter failure) and
/// outranks every protocol anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Critical,
    Error,
}

impl Severity {
    /// Returns the token written to the log sink.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
        }
    }

    /// Process exit code for a run whose overall severity is `self`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Error => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Severity::Ok),
            "WARNING" => Ok(Severity::Warning),
            "CRITICAL" => Ok(Severity::Critical),
            "ERROR" => Ok(Severity::Error),
            _ => Err(UnknownToken::Severity),
        }
    }
}

/// Protocol group a finding belongs to.
///
/// The declaration order is the order in which groups appear in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Protocol {
    /// Run configuration, before any input is touched.
    Config,
    Ptp,
    Capture,
    Goose,
    SampledValues,
    Mms,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Config => "CONFIG",
            Protocol::Ptp => "PTP",
            Protocol::Capture => "CAPTURE",
            Protocol::Goose => "GOOSE",
            Protocol::SampledValues => "SV",
            Protocol::Mms => "MMS",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! codes {
    ($($variant:ident => ($text:literal, $proto:ident)),+ $(,)?) => {
        /// Stable diagnostic code: protocol prefix plus condition identifier.
        ///
        /// The textual form (e.g. `GOOSE_SEQ_ANOMALY`) is part of the log
        /// contract and must never change for an existing variant.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
        pub enum Code {
            $($variant,)+
        }

        impl Code {
            /// Every known code, in declaration order.
            pub const ALL: &'static [Code] = &[$(Code::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Code::$variant => $text,)+
                }
            }

            /// Protocol group used when ordering a report.
            pub fn protocol(&self) -> Protocol {
                match self {
                    $(Code::$variant => Protocol::$proto,)+
                }
            }
        }

        impl FromStr for Code {
            type Err = UnknownToken;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Code::$variant),)+
                    _ => Err(UnknownToken::Code),
                }
            }
        }
    };
}

codes! {
    ConfigError => ("CONFIG_ERROR", Config),
    PtpSetupError => ("PTP_SETUP_ERROR", Ptp),
    PtpNoData => ("PTP_NO_DATA", Ptp),
    PtpParseError => ("PTP_PARSE_ERROR", Ptp),
    PtpFaulty => ("PTP_FAULTY", Ptp),
    PtpNotLocked => ("PTP_NOT_LOCKED", Ptp),
    PtpOffset => ("PTP_OFFSET", Ptp),
    PtpDelayDrift => ("PTP_DELAY_DRIFT", Ptp),
    PtpGmChange => ("PTP_GM_CHANGE", Ptp),
    PtpNoGm => ("PTP_NO_GM", Ptp),
    PtpPathDelay => ("PTP_PATH_DELAY", Ptp),
    PtpGmClockClass => ("PTP_GM_CLOCK_CLASS", Ptp),
    PtpNotTraceable => ("PTP_NOT_TRACEABLE", Ptp),
    PtpProfile => ("PTP_PROFILE", Ptp),
    PtpProfileMismatch => ("PTP_PROFILE_MISMATCH", Ptp),
    CaptureSetupError => ("CAPTURE_SETUP_ERROR", Capture),
    GooseDecodeError => ("GOOSE_DECODE_ERROR", Goose),
    GooseSeqAnomaly => ("GOOSE_SEQ_ANOMALY", Goose),
    GooseSilent => ("GOOSE_SILENT", Goose),
    GooseTtlExpired => ("GOOSE_TTL_EXPIRED", Goose),
    GooseSummary => ("GOOSE_SUMMARY", Goose),
    SvDecodeError => ("SV_DECODE_ERROR", SampledValues),
    SvRateDeviation => ("SV_RATE_DEVIATION", SampledValues),
    SvUnsynchronized => ("SV_UNSYNCHRONIZED", SampledValues),
    SvSummary => ("SV_SUMMARY", SampledValues),
    MmsDecodeError => ("MMS_DECODE_ERROR", Mms),
    MmsReport => ("MMS_REPORT", Mms),
    MmsReportFlood => ("MMS_REPORT_FLOOD", Mms),
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A severity or code token that is not part of the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownToken {
    Severity,
    Code,
}

impl fmt::Display for UnknownToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownToken::Severity => f.write_str("unknown severity token"),
            UnknownToken::Code => f.write_str("unknown diagnostic code"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownToken {}
