//! Wavemail Domain Layer
//!
//! This crate contains the core data model for wavemail: the state we keep
//! per collaborative document ("wavelet"), the pending-edit records ("blips")
//! that accumulate between digest emails, and the trait boundaries behind
//! which the real collaborators live (persistence, mail transport, address
//! resolution).
//!
//! ## Key Concepts
//!
//! - **Wavelet**: a collaborative document thread, the aggregate root
//! - **Edit record**: one unsent sub-document edit, with its debounce clock
//! - **Sendable**: an edit whose timeout rules permit emailing it now
//! - **Provenance record**: correlates an outgoing digest to later replies
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - Infrastructure implementations live in other crates
//! - All timestamps are milliseconds since the Unix epoch (`Timestamp`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod edit;
pub mod message;
pub mod provenance;
pub mod time;
pub mod traits;
pub mod wavelet;

// Re-exports for convenience
pub use address::{EmailAddress, ParticipantId};
pub use edit::EditRecord;
pub use message::OutboundMessage;
pub use provenance::ProvenanceRecord;
pub use time::{now_millis, Timestamp, IMMEDIATELY_SENDABLE, TIME_INFINITY, TIME_UNSET};
pub use wavelet::{SendMode, WaveletId, WaveletState};
