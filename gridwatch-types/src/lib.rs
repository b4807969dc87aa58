//! # gridwatch-types
//!
//! Core types for passive PTP and IEC 61850 diagnostics. This crate defines
//! the vocabulary shared by the capture adapters, the diagnostic engine and
//! anything that consumes its reports.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON output
//! - **Closed shapes**: Parsed clock status is a typed struct, captured frames are a sum type
//! - **Stable codes**: Diagnostic codes have a fixed textual form for log consumers
//!
//! ## Features
//!
//! - `std` (default): Standard library support (wall-clock timestamps)
//! - `serde`: Serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use gridwatch_types::{Code, Finding, Severity, Timestamp};
//!
//! let finding = Finding::new(
//!     Severity::Critical,
//!     Code::GooseSeqAnomaly,
//!     "sqNum jumped from 3 to 5",
//!     Timestamp::from_micros(1_700_000_000_000_000),
//! );
//!
//! assert_eq!(finding.code.as_str(), "GOOSE_SEQ_ANOMALY");
//! assert!(finding.severity > Severity::Warning);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clock;
mod finding;
mod frame;
mod severity;
mod time;

pub use clock::*;
pub use finding::*;
pub use frame::*;
pub use severity::*;
pub use time::*;

/// EtherType of IEC 61850-8-1 GOOSE frames.
pub const GOOSE_ETHER_TYPE: u16 = 0x88B8;

/// EtherType of IEC 61850-9-2 Sampled Values frames.
pub const SV_ETHER_TYPE: u16 = 0x88BA;

/// TCP port carrying MMS (ISO-TSAP over TCP).
pub const MMS_TCP_PORT: u16 = 102;
