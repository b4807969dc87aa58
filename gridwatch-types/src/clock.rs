//! Parsed PTP port status.

use core::fmt;
use core::str::FromStr;

use crate::Timestamp;

/// State of the local PTP port, as reported by the clock daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PortState {
    Initializing,
    Faulty,
    Disabled,
    Listening,
    PreMaster,
    Master,
    Passive,
    Uncalibrated,
    Slave,
}

impl PortState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortState::Initializing => "INITIALIZING",
            PortState::Faulty => "FAULTY",
            PortState::Disabled => "DISABLED",
            PortState::Listening => "LISTENING",
            PortState::PreMaster => "PRE_MASTER",
            PortState::Master => "MASTER",
            PortState::Passive => "PASSIVE",
            PortState::Uncalibrated => "UNCALIBRATED",
            PortState::Slave => "SLAVE",
        }
    }

    /// Whether offset and delay figures are meaningful in this state.
    pub fn is_locked(&self) -> bool {
        matches!(self, PortState::Slave | PortState::Master)
    }

    /// States a port passes through while acquiring lock.
    pub fn is_acquiring(&self) -> bool {
        matches!(
            self,
            PortState::Initializing | PortState::Listening | PortState::Uncalibrated
        )
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortState {
    type Err = InvalidValue;

    /// Accepts linuxptp spellings and the IEEE 1588-2019 alternative terms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INITIALIZING" => Ok(PortState::Initializing),
            "FAULTY" => Ok(PortState::Faulty),
            "DISABLED" => Ok(PortState::Disabled),
            "LISTENING" => Ok(PortState::Listening),
            "PRE_MASTER" | "PRE_TIME_TRANSMITTER" => Ok(PortState::PreMaster),
            "MASTER" | "GRAND_MASTER" | "TIME_TRANSMITTER" => Ok(PortState::Master),
            "PASSIVE" => Ok(PortState::Passive),
            "UNCALIBRATED" => Ok(PortState::Uncalibrated),
            "SLAVE" | "CLIENT" | "TIME_RECEIVER" => Ok(PortState::Slave),
            _ => Err(InvalidValue),
        }
    }
}

/// How a port measures path delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DelayMechanism {
    /// linuxptp picks E2E or P2P from the first delay message seen.
    Auto,
    E2E,
    P2P,
    NoMechanism,
}

impl DelayMechanism {
    /// Decode the numeric value the management datasets carry.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(DelayMechanism::Auto),
            0x01 => Some(DelayMechanism::E2E),
            0x02 => Some(DelayMechanism::P2P),
            0xfe => Some(DelayMechanism::NoMechanism),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DelayMechanism::Auto => "Auto",
            DelayMechanism::E2E => "E2E",
            DelayMechanism::P2P => "P2P",
            DelayMechanism::NoMechanism => "NONE",
        }
    }
}

impl fmt::Display for DelayMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DelayMechanism {
    type Err = InvalidValue;

    /// Accepts the names linuxptp uses in configuration files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(DelayMechanism::Auto),
            "E2E" => Ok(DelayMechanism::E2E),
            "P2P" => Ok(DelayMechanism::P2P),
            "NONE" | "NO_MECHANISM" => Ok(DelayMechanism::NoMechanism),
            _ => Err(InvalidValue),
        }
    }
}

/// Network transport PTP messages travel over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transport {
    /// IEEE 802.3 Ethernet.
    #[cfg_attr(feature = "serde", serde(rename = "L2", alias = "l2"))]
    L2,
    #[cfg_attr(feature = "serde", serde(rename = "UDPv4", alias = "udpv4"))]
    UdpV4,
    #[cfg_attr(feature = "serde", serde(rename = "UDPv6", alias = "udpv6"))]
    UdpV6,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::L2 => "L2",
            Transport::UdpV4 => "UDPv4",
            Transport::UdpV6 => "UDPv6",
        }
    }

    pub fn is_ip(&self) -> bool {
        matches!(self, Transport::UdpV4 | Transport::UdpV6)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L2" | "IEEE802.3" => Ok(Transport::L2),
            "UDPV4" => Ok(Transport::UdpV4),
            "UDPV6" => Ok(Transport::UdpV6),
            _ => Err(InvalidValue),
        }
    }
}

/// An 8-byte PTP clock identity (EUI-64).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockIdentity(pub [u8; 8]);

impl fmt::Display for ClockIdentity {
    /// Formats the way linuxptp prints identities: `001122.fffe.334455`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}.{:02x}{:02x}.{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

impl FromStr for ClockIdentity {
    type Err = InvalidValue;

    /// Parses 16 hex digits, optionally separated by `.`, `:` or `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 8];
        let mut nibbles = 0usize;
        for c in s.trim().chars() {
            if matches!(c, '.' | ':' | '-') {
                continue;
            }
            let v = c.to_digit(16).ok_or(InvalidValue)? as u8;
            if nibbles >= 16 {
                return Err(InvalidValue);
            }
            let idx = nibbles / 2;
            bytes[idx] = (bytes[idx] << 4) | v;
            nibbles += 1;
        }
        if nibbles != 16 {
            return Err(InvalidValue);
        }
        Ok(ClockIdentity(bytes))
    }
}

/// A value that does not belong to the expected vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidValue;

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid value")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidValue {}

/// One snapshot of the local PTP port, built from a single query cycle.
///
/// A port that is not locked (see [`PortState::is_locked`]) still carries the
/// numeric fields the daemon reported, but they are not meaningful and must
/// not be evaluated against thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockStatus {
    /// When the status block was collected.
    pub observed_at: Timestamp,
    /// Offset from master in nanoseconds.
    pub offset_ns: i64,
    /// Mean path delay in nanoseconds.
    pub mean_path_delay_ns: i64,
    /// Frequency adjustment in parts per billion.
    pub freq_adj_ppb: i64,
    pub port_state: PortState,
    pub grandmaster: ClockIdentity,

    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub gm_present: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub gm_clock_class: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub time_traceable: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub frequency_traceable: Option<bool>,

    // Port configuration, used to recognize the deployed profile.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub domain: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub delay_mechanism: Option<DelayMechanism>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub two_step: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub log_sync_interval: Option<i8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub log_announce_interval: Option<i8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn port_state_aliases() {
        assert_eq!("SLAVE".parse(), Ok(PortState::Slave));
        assert_eq!("time_receiver".parse(), Ok(PortState::Slave));
        assert_eq!("TIME_TRANSMITTER".parse(), Ok(PortState::Master));
        assert_eq!("PRE_MASTER".parse(), Ok(PortState::PreMaster));
        assert!("LOCKED".parse::<PortState>().is_err());
    }

    #[test]
    fn locked_states() {
        assert!(PortState::Slave.is_locked());
        assert!(PortState::Master.is_locked());
        assert!(!PortState::Uncalibrated.is_locked());
        assert!(PortState::Uncalibrated.is_acquiring());
        assert!(!PortState::Faulty.is_acquiring());
    }

    #[test]
    fn delay_mechanism_codes_and_names() {
        assert_eq!(DelayMechanism::from_code(2), Some(DelayMechanism::P2P));
        assert_eq!(DelayMechanism::from_code(0xfe), Some(DelayMechanism::NoMechanism));
        assert_eq!(DelayMechanism::from_code(7), None);
        assert_eq!("e2e".parse(), Ok(DelayMechanism::E2E));
        assert_eq!(DelayMechanism::Auto.to_string(), "Auto");
    }

    #[test]
    fn transport_names() {
        assert_eq!("udpv4".parse(), Ok(Transport::UdpV4));
        assert_eq!("L2".parse(), Ok(Transport::L2));
        assert!("tcp".parse::<Transport>().is_err());
        assert!(Transport::UdpV6.is_ip());
        assert!(!Transport::L2.is_ip());
    }

    #[test]
    fn clock_identity_linuxptp_format() {
        let id: ClockIdentity = "001122.fffe.334455".parse().unwrap();
        assert_eq!(id.0, [0x00, 0x11, 0x22, 0xff, 0xfe, 0x33, 0x44, 0x55]);
        assert_eq!(id.to_string(), "001122.fffe.334455");
    }

    #[test]
    fn clock_identity_rejects_bad_length() {
        assert!("001122.fffe.3344".parse::<ClockIdentity>().is_err());
        assert!("001122.fffe.33445566".parse::<ClockIdentity>().is_err());
        assert!("00112g.fffe.334455".parse::<ClockIdentity>().is_err());
    }
}
