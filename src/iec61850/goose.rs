use gridwatch_types::{GooseFrame, RawFrame};

use super::ber::{elements, expect_tag, string, uint};
use super::{split_app_header, DecodeError};

const GOOSE_PDU: u8 = 0x61;
const GOCB_REF: u8 = 0x80;
const TIME_ALLOWED_TO_LIVE: u8 = 0x81;
const ST_NUM: u8 = 0x85;
const SQ_NUM: u8 = 0x86;

/// Decode a GOOSE frame (EtherType 0x88B8).
///
/// `gocbRef`, `stNum` and `sqNum` are mandatory; `timeAllowedtoLive` is kept
/// when present.
pub fn decode_goose(raw: &RawFrame) -> Result<GooseFrame, DecodeError> {
    let (app_id, pdu) = split_app_header(&raw.payload)?;
    let body = expect_tag(pdu, GOOSE_PDU, "goosePdu")?;

    let mut gocb_ref = None;
    let mut ttl_ms = None;
    let mut st_num = None;
    let mut sq_num = None;

    for element in elements(body) {
        let element = element?;
        match element.tag {
            GOCB_REF => gocb_ref = Some(string(element.value, "gocbRef")?),
            TIME_ALLOWED_TO_LIVE => ttl_ms = Some(uint(element.value, "timeAllowedtoLive")?),
            ST_NUM => st_num = Some(uint(element.value, "stNum")?),
            SQ_NUM => sq_num = Some(uint(element.value, "sqNum")?),
            _ => {}
        }
    }

    Ok(GooseFrame {
        seq: raw.seq,
        timestamp: raw.timestamp,
        source: raw.src_mac,
        app_id,
        gocb_ref: gocb_ref.ok_or(DecodeError::Missing("gocbRef"))?,
        st_num: st_num.ok_or(DecodeError::Missing("stNum"))?,
        sq_num: sq_num.ok_or(DecodeError::Missing("sqNum"))?,
        ttl_ms,
    })
}
