//! # gridwatch-adapters
//!
//! Capture and query adapters for the gridwatch diagnostic engine.
//!
//! The engine never talks to the network or the clock daemon itself; these
//! adapters do, and hand over opaque inputs: raw status text and raw frames.
//!
//! ## Supported Sources
//!
//! - **pcap** (always available) - decodes classic libpcap streams and files
//!   into [`RawFrame`]s, stripping VLAN tags and locating TCP payloads
//! - **pmc** (`pmc` feature) - runs the linuxptp management client against a
//!   running `ptp4l` and returns the response text
//! - **tcpdump** (`tcpdump` feature) - captures live traffic for a bounded
//!   window and decodes it with the pcap decoder
//!
//! ## Quick Start (offline capture)
//!
//! ```rust,no_run
//! use gridwatch_adapters::pcap::read_pcap_file;
//! use std::path::Path;
//!
//! let frames = read_pcap_file(Path::new("substation.pcap"))?;
//! println!("{} frames", frames.len());
//! # Ok::<(), gridwatch_adapters::AdapterError>(())
//! ```

pub mod error;
pub mod pcap;

#[cfg(feature = "pmc")]
pub mod pmc;

#[cfg(feature = "tcpdump")]
pub mod tcpdump;

pub use error::AdapterError;

// Re-export types for convenience
pub use gridwatch_types::{MacAddr, RawFrame, TcpEndpoints, Timestamp};
