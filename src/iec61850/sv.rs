use gridwatch_types::{RawFrame, SvFrame};

use super::ber::{elements, expect_tag, string, uint};
use super::{split_app_header, DecodeError};

const SAV_PDU: u8 = 0x60;
const SEQ_ASDU: u8 = 0xa2;
const ASDU: u8 = 0x30;
const SV_ID: u8 = 0x80;
const SMP_CNT: u8 = 0x82;
const SMP_SYNCH: u8 = 0x85;
const SMP_RATE: u8 = 0x86;

struct Asdu {
    sv_id: String,
    smp_cnt: u16,
    synchronized: bool,
    smp_rate: Option<u16>,
}

/// Decode a Sampled Values frame (EtherType 0x88BA).
///
/// The frame is identified by its first ASDU; every ASDU must carry `svID`,
/// `smpCnt` and `smpSynch`.
pub fn decode_sv(raw: &RawFrame) -> Result<SvFrame, DecodeError> {
    let (app_id, pdu) = split_app_header(&raw.payload)?;
    let body = expect_tag(pdu, SAV_PDU, "savPdu")?;

    let mut seq_asdu = None;
    for element in elements(body) {
        let element = element?;
        if element.tag == SEQ_ASDU {
            seq_asdu = Some(element.value);
        }
    }
    let seq_asdu = seq_asdu.ok_or(DecodeError::Missing("seqASDU"))?;

    let mut asdus = Vec::new();
    for element in elements(seq_asdu) {
        let element = element?;
        if element.tag != ASDU {
            return Err(DecodeError::UnexpectedTag {
                what: "ASDU",
                tag: element.tag,
            });
        }
        asdus.push(decode_asdu(element.value)?);
    }

    let count = u16::try_from(asdus.len()).map_err(|_| DecodeError::Malformed("seqASDU"))?;
    let synchronized = asdus.iter().all(|a| a.synchronized);
    let first = asdus
        .into_iter()
        .next()
        .ok_or(DecodeError::Missing("ASDU"))?;

    Ok(SvFrame {
        seq: raw.seq,
        timestamp: raw.timestamp,
        source: raw.src_mac,
        app_id,
        sv_id: first.sv_id,
        smp_cnt: first.smp_cnt,
        samples_per_cycle: first.smp_rate,
        synchronized,
        asdu_count: count,
    })
}

fn decode_asdu(body: &[u8]) -> Result<Asdu, DecodeError> {
    let mut sv_id = None;
    let mut smp_cnt = None;
    let mut smp_synch = None;
    let mut smp_rate = None;

    for element in elements(body) {
        let element = element?;
        match element.tag {
            SV_ID => sv_id = Some(string(element.value, "svID")?),
            SMP_CNT => smp_cnt = Some(uint16(element.value, "smpCnt")?),
            SMP_SYNCH => smp_synch = Some(uint(element.value, "smpSynch")?),
            SMP_RATE => smp_rate = Some(uint16(element.value, "smpRate")?),
            _ => {}
        }
    }

    Ok(Asdu {
        sv_id: sv_id.ok_or(DecodeError::Missing("svID"))?,
        smp_cnt: smp_cnt.ok_or(DecodeError::Missing("smpCnt"))?,
        synchronized: smp_synch.ok_or(DecodeError::Missing("smpSynch"))? != 0,
        smp_rate,
    })
}

fn uint16(value: &[u8], field: &'static str) -> Result<u16, DecodeError> {
    u16::try_from(uint(value, field)?).map_err(|_| DecodeError::Malformed(field))
}
