//! IEC 61850 frame classification, decoding and health evaluation.
//!
//! GOOSE and Sampled Values travel directly over Ethernet and are recognized
//! by EtherType; MMS rides on ISO transport over TCP port 102. Each captured
//! frame lands in exactly one of the three variants or is dropped.

pub mod ber;
mod classify;
mod goose;
mod health;
mod mms;
mod sv;

pub use classify::{classify, classify_all, FrameError};
pub use goose::decode_goose;
pub use health::evaluate;
pub use mms::decode_mms;
pub use sv::decode_sv;

use thiserror::Error;

/// A frame whose mandatory fields could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("malformed {0}")]
    Malformed(&'static str),

    #[error("unexpected tag 0x{tag:02x} for {what}")]
    UnexpectedTag { what: &'static str, tag: u8 },

    #[error("unsupported encoding: {0}")]
    Unsupported(&'static str),
}

/// Split the 8-byte GOOSE/SV header from the PDU that follows it.
///
/// Returns the APPID and the PDU bytes bounded by the header's length field,
/// which excludes any Ethernet padding.
pub(crate) fn split_app_header(payload: &[u8]) -> Result<(u16, &[u8]), DecodeError> {
    if payload.len() < 8 {
        return Err(DecodeError::Truncated("application header"));
    }
    let app_id = u16::from_be_bytes([payload[0], payload[1]]);
    let length = u16::from_be_bytes([payload[2], payload[3]]) as usize;
    if length < 8 {
        return Err(DecodeError::Malformed("application header length"));
    }
    if length > payload.len() {
        return Err(DecodeError::Truncated("PDU"));
    }
    Ok((app_id, &payload[8..length]))
}
