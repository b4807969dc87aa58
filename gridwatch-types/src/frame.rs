//! Captured and classified frames.
//!
//! [`RawFrame`] is what a capture adapter hands over: link-layer header
//! fields plus the remaining bytes. [`Frame`] is the classified, decoded
//! form with exactly one protocol variant per frame.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::net::SocketAddr;

use crate::{Protocol, Timestamp};

/// A 48-bit Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// TCP endpoints of a captured segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TcpEndpoints {
    pub src: SocketAddr,
    pub dst: SocketAddr,
}

/// One captured Ethernet frame, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Position in the capture, assigned by the adapter.
    pub seq: u64,
    pub timestamp: Timestamp,
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    /// EtherType after any 802.1Q tags have been stripped.
    pub ether_type: u16,
    /// Present when the frame carries an IPv4/IPv6 TCP segment.
    pub tcp: Option<TcpEndpoints>,
    /// Bytes after the Ethernet header, or after the TCP header for TCP segments.
    pub payload: Vec<u8>,
    /// Original length on the wire.
    pub wire_len: u32,
}

impl RawFrame {
    /// Destination TCP port, if this is a TCP segment.
    pub fn dst_port(&self) -> Option<u16> {
        self.tcp.map(|t| t.dst.port())
    }
}

/// A decoded GOOSE message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GooseFrame {
    pub seq: u64,
    pub timestamp: Timestamp,
    pub source: MacAddr,
    pub app_id: u16,
    /// GOOSE control-block reference (`gocbRef`).
    pub gocb_ref: String,
    pub st_num: u32,
    pub sq_num: u32,
    /// `timeAllowedtoLive` in milliseconds, when present.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub ttl_ms: Option<u32>,
}

/// A decoded Sampled Values frame.
///
/// Identity and counters come from the first ASDU of the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SvFrame {
    pub seq: u64,
    pub timestamp: Timestamp,
    pub source: MacAddr,
    pub app_id: u16,
    pub sv_id: String,
    pub smp_cnt: u16,
    /// Declared samples per nominal cycle (`smpRate`), when present.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub samples_per_cycle: Option<u16>,
    /// `smpSynch` is nonzero in every ASDU of the frame.
    pub synchronized: bool,
    /// Number of ASDUs (samples) carried by the frame.
    pub asdu_count: u16,
}

/// What an MMS segment carries, as far as diagnostics care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MmsPdu {
    /// Connection or MMS association setup.
    Association,
    /// Unconfirmed information report.
    Report,
    Other,
}

/// A decoded MMS segment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MmsFrame {
    pub seq: u64,
    pub timestamp: Timestamp,
    /// Server-side TCP port; always the MMS port.
    pub port: u16,
    pub pdu: MmsPdu,
    pub session: TcpEndpoints,
}

impl MmsFrame {
    /// Whether this segment is a report or an association.
    pub fn is_report_or_association(&self) -> bool {
        matches!(self.pdu, MmsPdu::Report | MmsPdu::Association)
    }
}

/// A classified industrial-protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Frame {
    Goose(GooseFrame),
    SampledValues(SvFrame),
    Mms(MmsFrame),
}

impl Frame {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Frame::Goose(f) => f.timestamp,
            Frame::SampledValues(f) => f.timestamp,
            Frame::Mms(f) => f.timestamp,
        }
    }

    /// Capture sequence number, used to break timestamp ties.
    pub fn seq(&self) -> u64 {
        match self {
            Frame::Goose(f) => f.seq,
            Frame::SampledValues(f) => f.seq,
            Frame::Mms(f) => f.seq,
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Frame::Goose(_) => Protocol::Goose,
            Frame::SampledValues(_) => Protocol::SampledValues,
            Frame::Mms(_) => Protocol::Mms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn mac_display() {
        let mac = MacAddr([0x01, 0x0c, 0xcd, 0x01, 0x00, 0x2a]);
        assert_eq!(mac.to_string(), "01:0c:cd:01:00:2a");
    }

    #[test]
    fn raw_frame_dst_port() {
        let mut raw = RawFrame {
            seq: 0,
            timestamp: Timestamp::default(),
            src_mac: MacAddr::default(),
            dst_mac: MacAddr::default(),
            ether_type: 0x0800,
            tcp: None,
            payload: vec![],
            wire_len: 60,
        };
        assert_eq!(raw.dst_port(), None);
        raw.tcp = Some(TcpEndpoints {
            src: "10.0.0.2:49152".parse().unwrap(),
            dst: "10.0.0.1:102".parse().unwrap(),
        });
        assert_eq!(raw.dst_port(), Some(102));
    }

    #[test]
    fn frame_accessors() {
        let frame = Frame::Goose(GooseFrame {
            seq: 7,
            timestamp: Timestamp::from_micros(99),
            source: MacAddr::default(),
            app_id: 1,
            gocb_ref: "IED1LD0/LLN0$GO$gcb1".to_string(),
            st_num: 1,
            sq_num: 0,
            ttl_ms: None,
        });
        assert_eq!(frame.seq(), 7);
        assert_eq!(frame.timestamp(), Timestamp::from_micros(99));
        assert_eq!(frame.protocol(), Protocol::Goose);
    }
}
