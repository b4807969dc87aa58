//! PTP profile recognition.
//!
//! Substation and telecom profiles pin down the transport, domain, delay
//! mechanism and message rates. The profile in use is inferred from what
//! the port reports, and the port is then compared against the values that
//! profile expects.

use std::fmt;

use gridwatch_types::{DelayMechanism, Transport};

/// A PTP profile as recognized from port configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// IEC/IEEE 61850-9-3 Power Utility Profile.
    PowerUtility,
    /// ITU-T G.8275.1, full timing support from the network.
    TelecomFullTiming,
    /// ITU-T G.8275.2, partial timing support over IP.
    TelecomPartialTiming,
    /// IEEE 1588 Default Profile.
    Default,
    /// Layer 2 peer-to-peer on an unexpected domain.
    LayerTwoPeerToPeer,
    /// IP end-to-end on an unexpected domain.
    IpEndToEnd,
    Unknown,
}

/// What a profile requires of a port. Empty interval sets are not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectations {
    pub two_step: bool,
    pub log_sync_intervals: &'static [i8],
    pub log_announce_intervals: &'static [i8],
    pub delay_mechanism: Option<DelayMechanism>,
}

const POWER_UTILITY: Expectations = Expectations {
    two_step: true,
    log_sync_intervals: &[-4, -3],
    log_announce_intervals: &[0],
    delay_mechanism: Some(DelayMechanism::P2P),
};

const TELECOM_PARTIAL: Expectations = Expectations {
    two_step: false,
    log_sync_intervals: &[-4, -3, -2],
    log_announce_intervals: &[0],
    delay_mechanism: Some(DelayMechanism::E2E),
};

const DEFAULT: Expectations = Expectations {
    two_step: false,
    log_sync_intervals: &[-4, -3, -2, 0],
    log_announce_intervals: &[0, 1],
    delay_mechanism: Some(DelayMechanism::E2E),
};

const NONE: Expectations = Expectations {
    two_step: false,
    log_sync_intervals: &[],
    log_announce_intervals: &[],
    delay_mechanism: None,
};

impl Profile {
    /// Infer the profile from transport, domain and delay mechanism.
    ///
    /// Without a known transport, peer-to-peer implies layer 2 and every
    /// other mechanism implies IP.
    pub fn select(transport: Option<Transport>, domain: u8, mechanism: DelayMechanism) -> Self {
        let peer_to_peer = mechanism == DelayMechanism::P2P;
        let layer_two = transport.map_or(peer_to_peer, |t| t == Transport::L2);
        let ip = transport.map_or(!peer_to_peer, |t| t.is_ip());

        if layer_two && peer_to_peer {
            return match domain {
                0 | 1 => Profile::PowerUtility,
                24 => Profile::TelecomFullTiming,
                _ => Profile::LayerTwoPeerToPeer,
            };
        }
        if ip && !peer_to_peer {
            return match domain {
                24 => Profile::TelecomPartialTiming,
                0 => Profile::Default,
                _ => Profile::IpEndToEnd,
            };
        }
        Profile::Unknown
    }

    pub fn name(&self) -> &'static str {
        match self {
            Profile::PowerUtility => "IEC/IEEE 61850-9-3 (Power Utility Profile)",
            Profile::TelecomFullTiming => "ITU-T G.8275.1 (Telecom, full timing support)",
            Profile::TelecomPartialTiming => "ITU-T G.8275.2 (Telecom, partial timing support)",
            Profile::Default => "IEEE 1588 Default Profile",
            Profile::LayerTwoPeerToPeer => "L2 P2P (likely 61850-9-3 or G.8275.1)",
            Profile::IpEndToEnd => "IP E2E (likely Default or G.8275.2)",
            Profile::Unknown => "unknown profile",
        }
    }

    /// Unrecognized domains are held to the closest named profile.
    pub fn expectations(&self) -> Expectations {
        match self {
            Profile::PowerUtility | Profile::TelecomFullTiming | Profile::LayerTwoPeerToPeer => {
                POWER_UTILITY
            }
            Profile::TelecomPartialTiming | Profile::IpEndToEnd => TELECOM_PARTIAL,
            Profile::Default => DEFAULT,
            Profile::Unknown => NONE,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_utility_on_layer_two() {
        let p = Profile::select(Some(Transport::L2), 0, DelayMechanism::P2P);
        assert_eq!(p, Profile::PowerUtility);
        assert_eq!(p.expectations().delay_mechanism, Some(DelayMechanism::P2P));
        assert!(p.expectations().two_step);
    }

    #[test]
    fn test_telecom_domains() {
        assert_eq!(
            Profile::select(Some(Transport::L2), 24, DelayMechanism::P2P),
            Profile::TelecomFullTiming
        );
        assert_eq!(
            Profile::select(Some(Transport::UdpV4), 24, DelayMechanism::E2E),
            Profile::TelecomPartialTiming
        );
    }

    #[test]
    fn test_default_profile_over_ip() {
        assert_eq!(
            Profile::select(Some(Transport::UdpV6), 0, DelayMechanism::Auto),
            Profile::Default
        );
        assert_eq!(
            Profile::select(Some(Transport::UdpV4), 7, DelayMechanism::E2E),
            Profile::IpEndToEnd
        );
    }

    #[test]
    fn test_transport_inferred_from_mechanism() {
        assert_eq!(Profile::select(None, 1, DelayMechanism::P2P), Profile::PowerUtility);
        assert_eq!(Profile::select(None, 0, DelayMechanism::E2E), Profile::Default);
    }

    #[test]
    fn test_mixed_configuration_is_unknown() {
        let p = Profile::select(Some(Transport::L2), 0, DelayMechanism::E2E);
        assert_eq!(p, Profile::Unknown);
        assert_eq!(p.expectations(), NONE);
        assert_eq!(
            Profile::select(Some(Transport::UdpV4), 0, DelayMechanism::P2P),
            Profile::Unknown
        );
    }
}
