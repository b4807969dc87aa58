//! MMS over ISO transport (RFC 1006).
//!
//! The segment is peeled layer by layer: TPKT, COTP, session, presentation
//! and finally the outer MMS PDU tag. Only TPKT and COTP are mandatory;
//! anything past them that does not look like an association or a report is
//! simply `Other`.
//!
//! A TPKT may span several TCP segments. Segments that do not start with a
//! TPKT header are continuations and count as `Other`; a TPKT cut short by
//! the segment boundary is classified from the bytes at hand.

use gridwatch_types::{MmsFrame, MmsPdu, RawFrame};

use super::ber::{elements, read_tlv};
use super::DecodeError;

const TPKT_VERSION: u8 = 0x03;

const COTP_CONNECTION_REQUEST: u8 = 0xe0;
const COTP_CONNECTION_CONFIRM: u8 = 0xd0;
const COTP_DATA: u8 = 0xf0;

const SPDU_CONNECT: u8 = 0x0d;
const SPDU_ACCEPT: u8 = 0x0e;
const SPDU_GIVE_TOKENS: u8 = 0x01;

const PRESENTATION_USER_DATA: u8 = 0x61;
const PDV_LIST: u8 = 0x30;
const SINGLE_ASN1_TYPE: u8 = 0xa0;

const MMS_UNCONFIRMED: u8 = 0xa3;
const MMS_INITIATE_REQUEST: u8 = 0xa8;
const MMS_INITIATE_RESPONSE: u8 = 0xa9;

/// Decode a TCP segment sent to the MMS port.
pub fn decode_mms(raw: &RawFrame) -> Result<MmsFrame, DecodeError> {
    let session = raw.tcp.ok_or(DecodeError::Missing("TCP header"))?;
    let pdu = match raw.payload.first() {
        Some(&TPKT_VERSION) => classify_tpkt(&raw.payload)?,
        _ => MmsPdu::Other,
    };

    Ok(MmsFrame {
        seq: raw.seq,
        timestamp: raw.timestamp,
        port: session.dst.port(),
        pdu,
        session,
    })
}

fn classify_tpkt(payload: &[u8]) -> Result<MmsPdu, DecodeError> {
    if payload.len() < 4 {
        return Err(DecodeError::Truncated("TPKT header"));
    }
    let length = u16::from_be_bytes([payload[2], payload[3]]) as usize;
    if length < 7 {
        return Err(DecodeError::Malformed("TPKT length"));
    }
    let cotp = &payload[4..length.min(payload.len())];
    if cotp.is_empty() {
        return Err(DecodeError::Truncated("COTP header"));
    }

    let header_len = cotp[0] as usize + 1;
    if cotp.len() < header_len || header_len < 2 {
        return Err(DecodeError::Truncated("COTP header"));
    }

    Ok(match cotp[1] & 0xf0 {
        COTP_CONNECTION_REQUEST | COTP_CONNECTION_CONFIRM => MmsPdu::Association,
        COTP_DATA => classify_session(&cotp[header_len..]),
        _ => MmsPdu::Other,
    })
}

fn classify_session(spdu: &[u8]) -> MmsPdu {
    match spdu {
        [SPDU_CONNECT, ..] | [SPDU_ACCEPT, ..] => MmsPdu::Association,
        [SPDU_GIVE_TOKENS, 0x00, 0x01, 0x00, rest @ ..] => classify_presentation(rest),
        _ => MmsPdu::Other,
    }
}

fn classify_presentation(ppdu: &[u8]) -> MmsPdu {
    mms_tag(ppdu)
        .map(|tag| match tag {
            MMS_INITIATE_REQUEST | MMS_INITIATE_RESPONSE => MmsPdu::Association,
            MMS_UNCONFIRMED => MmsPdu::Report,
            _ => MmsPdu::Other,
        })
        .unwrap_or(MmsPdu::Other)
}

/// Outer MMS PDU tag inside fully encoded presentation user data.
fn mms_tag(ppdu: &[u8]) -> Option<u8> {
    let (user_data, _) = read_tlv(ppdu).ok()?;
    if user_data.tag != PRESENTATION_USER_DATA {
        return None;
    }
    let (pdv_list, _) = read_tlv(user_data.value).ok()?;
    if pdv_list.tag != PDV_LIST {
        return None;
    }
    let values = elements(pdv_list.value)
        .filter_map(Result::ok)
        .find(|e| e.tag == SINGLE_ASN1_TYPE)?;
    values.value.first().copied()
}
