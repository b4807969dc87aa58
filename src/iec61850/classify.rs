use gridwatch_types::{
    Code, Finding, Frame, Protocol, RawFrame, Timestamp, GOOSE_ETHER_TYPE, MMS_TCP_PORT,
    SV_ETHER_TYPE,
};
use thiserror::Error;

use super::{decode_goose, decode_mms, decode_sv, DecodeError};

/// A frame that was recognized by protocol but failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{protocol} frame #{seq}: {source}")]
pub struct FrameError {
    pub protocol: Protocol,
    pub seq: u64,
    pub timestamp: Timestamp,
    #[source]
    pub source: DecodeError,
}

impl FrameError {
    fn new(raw: &RawFrame, protocol: Protocol, source: DecodeError) -> Self {
        Self {
            protocol,
            seq: raw.seq,
            timestamp: raw.timestamp,
            source,
        }
    }

    /// The warning this failure is reported as.
    pub fn to_finding(&self) -> Finding {
        let code = match self.protocol {
            Protocol::Goose => Code::GooseDecodeError,
            Protocol::SampledValues => Code::SvDecodeError,
            _ => Code::MmsDecodeError,
        };
        Finding::warning(code, self.to_string(), self.timestamp)
    }
}

/// Classify and decode one captured frame.
///
/// `Ok(None)` means the frame belongs to none of the monitored protocols.
pub fn classify(raw: &RawFrame) -> Result<Option<Frame>, FrameError> {
    let frame = match raw.ether_type {
        GOOSE_ETHER_TYPE => decode_goose(raw)
            .map(Frame::Goose)
            .map_err(|e| FrameError::new(raw, Protocol::Goose, e))?,
        SV_ETHER_TYPE => decode_sv(raw)
            .map(Frame::SampledValues)
            .map_err(|e| FrameError::new(raw, Protocol::SampledValues, e))?,
        _ if raw.dst_port() == Some(MMS_TCP_PORT) => decode_mms(raw)
            .map(Frame::Mms)
            .map_err(|e| FrameError::new(raw, Protocol::Mms, e))?,
        _ => return Ok(None),
    };
    Ok(Some(frame))
}

/// Classify a whole capture, turning decode failures into warnings.
pub fn classify_all(raws: &[RawFrame]) -> (Vec<Frame>, Vec<Finding>) {
    let mut frames = Vec::new();
    let mut findings = Vec::new();

    for raw in raws {
        match classify(raw) {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => {}
            Err(e) => findings.push(e.to_finding()),
        }
    }

    (frames, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iec61850::testing::{app_payload, goose_pdu, raw, raw_tcp, sv_asdu, sv_pdu};
    use gridwatch_types::Severity;

    #[test]
    fn test_classify_by_ether_type_and_port() {
        let goose = raw(0, 0, GOOSE_ETHER_TYPE, app_payload(1, &goose_pdu("gcb", None, 1, 1)));
        let sv = raw(1, 0, SV_ETHER_TYPE, app_payload(1, &sv_pdu(&[sv_asdu("MU", 0, 1, None)])));
        let mms = raw_tcp(2, 0, 50000, 102, Vec::new());

        assert!(matches!(classify(&goose), Ok(Some(Frame::Goose(_)))));
        assert!(matches!(classify(&sv), Ok(Some(Frame::SampledValues(_)))));
        assert!(matches!(classify(&mms), Ok(Some(Frame::Mms(_)))));
    }

    #[test]
    fn test_unrelated_frames_are_dropped() {
        assert_eq!(classify(&raw(0, 0, 0x88f7, vec![0; 44])), Ok(None));
        assert_eq!(classify(&raw(0, 0, 0x0806, vec![0; 28])), Ok(None));
        // Server-to-client traffic leaves port 102 as its source.
        assert_eq!(classify(&raw_tcp(0, 0, 102, 50000, Vec::new())), Ok(None));
        assert_eq!(classify(&raw_tcp(0, 0, 50000, 443, Vec::new())), Ok(None));
    }

    #[test]
    fn test_decode_failure_becomes_warning() {
        let broken = raw(4, 77, GOOSE_ETHER_TYPE, vec![0x00, 0x01, 0x00]);
        let ok = raw(5, 78, GOOSE_ETHER_TYPE, app_payload(1, &goose_pdu("gcb", None, 1, 1)));
        let bad_mms = raw_tcp(6, 79, 50000, 102, vec![0x03, 0x00, 0x00, 0x02, 0xff]);

        let (frames, findings) = classify_all(&[broken, ok, bad_mms]);
        assert_eq!(frames.len(), 1);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].code, Code::GooseDecodeError);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].timestamp, Timestamp::from_micros(77));
        assert!(findings[0].message.contains("#4"));
        assert_eq!(findings[1].code, Code::MmsDecodeError);
    }

    #[test]
    fn test_mms_continuation_segments_are_not_errors() {
        let continuation = raw_tcp(0, 0, 50000, 102, vec![0x30, 0x82, 0x01, 0x00, 0xa0]);
        let (frames, findings) = classify_all(&[continuation]);
        assert_eq!(frames.len(), 1);
        assert!(findings.is_empty());
    }
}
