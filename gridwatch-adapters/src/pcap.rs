//! Classic libpcap stream decoding.
//!
//! Both the offline replay path (`tcpdump -w capture.pcap`) and the live
//! tcpdump adapter (`tcpdump -w -`) produce the classic pcap format, so one
//! decoder serves both. Only Ethernet link-layer captures are supported.
//!
//! A capture cut short (tcpdump killed at the end of the window) usually
//! ends in a partial record; the partial record is dropped and everything
//! before it is kept.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;

use gridwatch_types::{MacAddr, RawFrame, TcpEndpoints, Timestamp};
use tracing::debug;

use crate::AdapterError;

const MAGIC_MICROS: u32 = 0xa1b2_c3d4;
const MAGIC_NANOS: u32 = 0xa1b2_3c4d;
const GLOBAL_HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: usize = 16;
const LINKTYPE_ETHERNET: u32 = 1;

const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88a8;
const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86dd;
const IP_PROTO_TCP: u8 = 6;

/// Read and decode a pcap file.
pub fn read_pcap_file(path: &Path) -> Result<Vec<RawFrame>, AdapterError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AdapterError::Unavailable(format!("capture file {} not found", path.display()))
        }
        _ => AdapterError::from(e),
    })?;
    decode_pcap(&bytes)
}

/// Decode a complete (or truncated) pcap byte stream into raw frames.
///
/// Frames are numbered in capture order starting from zero.
pub fn decode_pcap(bytes: &[u8]) -> Result<Vec<RawFrame>, AdapterError> {
    if bytes.len() < GLOBAL_HEADER_LEN {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        return Err(AdapterError::Parse("pcap global header truncated".to_string()));
    }

    let (little_endian, nanos) = match (
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    ) {
        (MAGIC_MICROS, _) => (true, false),
        (MAGIC_NANOS, _) => (true, true),
        (_, MAGIC_MICROS) => (false, false),
        (_, MAGIC_NANOS) => (false, true),
        (le, _) => {
            return Err(AdapterError::Parse(format!(
                "not a pcap stream (magic {:#010x})",
                le
            )))
        }
    };
    let read_u32 = |b: &[u8]| {
        let arr = [b[0], b[1], b[2], b[3]];
        if little_endian {
            u32::from_le_bytes(arr)
        } else {
            u32::from_be_bytes(arr)
        }
    };

    let link_type = read_u32(&bytes[20..24]) & 0x0fff_ffff;
    if link_type != LINKTYPE_ETHERNET {
        return Err(AdapterError::Capture(format!(
            "unsupported link type {} (Ethernet required)",
            link_type
        )));
    }

    let mut frames = Vec::new();
    let mut offset = GLOBAL_HEADER_LEN;
    let mut seq = 0u64;

    while offset + RECORD_HEADER_LEN <= bytes.len() {
        let header = &bytes[offset..offset + RECORD_HEADER_LEN];
        let ts_sec = read_u32(&header[0..4]) as u64;
        let ts_frac = read_u32(&header[4..8]);
        let incl_len = read_u32(&header[8..12]) as usize;
        let orig_len = read_u32(&header[12..16]);

        let start = offset + RECORD_HEADER_LEN;
        let Some(end) = start.checked_add(incl_len).filter(|&e| e <= bytes.len()) else {
            debug!(offset, incl_len, "dropping truncated pcap record");
            break;
        };

        let micros = if nanos { ts_frac / 1_000 } else { ts_frac };
        let timestamp = Timestamp::from_secs_micros(ts_sec, micros);
        if let Some(frame) = decode_ethernet(seq, timestamp, &bytes[start..end], orig_len) {
            frames.push(frame);
        }
        seq += 1;
        offset = end;
    }

    Ok(frames)
}

/// Decode one Ethernet frame into a [`RawFrame`].
///
/// 802.1Q / 802.1ad tags are stripped. IPv4 and IPv6 TCP segments get their
/// endpoints filled in and the payload trimmed to the TCP data. Returns
/// `None` for frames too short to carry an Ethernet header.
pub fn decode_ethernet(
    seq: u64,
    timestamp: Timestamp,
    data: &[u8],
    wire_len: u32,
) -> Option<RawFrame> {
    if data.len() < 14 {
        return None;
    }
    let dst_mac = MacAddr(data[0..6].try_into().ok()?);
    let src_mac = MacAddr(data[6..12].try_into().ok()?);
    let mut ether_type = u16::from_be_bytes([data[12], data[13]]);
    let mut offset = 14;

    while ether_type == ETHERTYPE_VLAN || ether_type == ETHERTYPE_QINQ {
        if data.len() < offset + 4 {
            return None;
        }
        ether_type = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
        offset += 4;
    }

    let body = &data[offset..];
    let segment = match ether_type {
        ETHERTYPE_IPV4 => tcp_over_ipv4(body),
        ETHERTYPE_IPV6 => tcp_over_ipv6(body),
        _ => None,
    };

    let (tcp, payload) = match segment {
        Some((endpoints, payload)) => (Some(endpoints), payload.to_vec()),
        None => (None, body.to_vec()),
    };

    Some(RawFrame {
        seq,
        timestamp,
        src_mac,
        dst_mac,
        ether_type,
        tcp,
        payload,
        wire_len,
    })
}

fn tcp_over_ipv4(ip: &[u8]) -> Option<(TcpEndpoints, &[u8])> {
    if ip.len() < 20 || ip[0] >> 4 != 4 {
        return None;
    }
    let header_len = ((ip[0] & 0x0f) as usize) * 4;
    let total_len = u16::from_be_bytes([ip[2], ip[3]]) as usize;
    let fragment_offset = u16::from_be_bytes([ip[6], ip[7]]) & 0x1fff;
    if ip[9] != IP_PROTO_TCP || fragment_offset != 0 || header_len < 20 || ip.len() < header_len {
        return None;
    }
    let src = IpAddr::V4(Ipv4Addr::new(ip[12], ip[13], ip[14], ip[15]));
    let dst = IpAddr::V4(Ipv4Addr::new(ip[16], ip[17], ip[18], ip[19]));
    // Ethernet padding follows short packets; trust the IP total length.
    let end = total_len.clamp(header_len, ip.len());
    tcp_segment(src, dst, &ip[header_len..end])
}

fn tcp_over_ipv6(ip: &[u8]) -> Option<(TcpEndpoints, &[u8])> {
    if ip.len() < 40 || ip[0] >> 4 != 6 || ip[6] != IP_PROTO_TCP {
        return None;
    }
    let payload_len = u16::from_be_bytes([ip[4], ip[5]]) as usize;
    let src: [u8; 16] = ip[8..24].try_into().ok()?;
    let dst: [u8; 16] = ip[24..40].try_into().ok()?;
    let end = (40 + payload_len).min(ip.len());
    tcp_segment(
        IpAddr::V6(Ipv6Addr::from(src)),
        IpAddr::V6(Ipv6Addr::from(dst)),
        &ip[40..end],
    )
}

fn tcp_segment(src: IpAddr, dst: IpAddr, tcp: &[u8]) -> Option<(TcpEndpoints, &[u8])> {
    if tcp.len() < 20 {
        return None;
    }
    let src_port = u16::from_be_bytes([tcp[0], tcp[1]]);
    let dst_port = u16::from_be_bytes([tcp[2], tcp[3]]);
    let data_offset = ((tcp[12] >> 4) as usize) * 4;
    if data_offset < 20 || tcp.len() < data_offset {
        return None;
    }
    Some((
        TcpEndpoints {
            src: SocketAddr::new(src, src_port),
            dst: SocketAddr::new(dst, dst_port),
        },
        &tcp[data_offset..],
    ))
}
