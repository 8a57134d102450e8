//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the scheduling core and the
//! infrastructure it relies on. Implementations live in other crates (or in
//! the host application); the core only depends on these contracts.

use crate::address::{EmailAddress, ParticipantId};
use crate::message::OutboundMessage;
use crate::provenance::ProvenanceRecord;
use crate::time::Timestamp;
use crate::wavelet::{WaveletId, WaveletState};

/// Durable storage for wavelet aggregate state.
///
/// Transactions are scoped per wavelet-processing unit: `save` and
/// `record_provenance` stage changes which become visible to later loads
/// only after `commit`; `rollback` discards everything staged since the
/// last commit.
pub trait WaveletStore {
    /// Error type for store operations
    type Error;

    /// Load a wavelet's state, or `None` if it was never saved.
    fn load(&self, id: &WaveletId) -> Result<Option<WaveletState>, Self::Error>;

    /// Stage a wavelet's state for the current transaction.
    fn save(&mut self, state: &WaveletState) -> Result<(), Self::Error>;

    /// Ids of wavelets whose `time_for_sending` is at or before `now`,
    /// ordered by that time. Read without a lock; callers must re-validate
    /// per wavelet.
    fn due_wavelets(&self, now: Timestamp) -> Result<Vec<WaveletId>, Self::Error>;

    /// Stage an append-only provenance record.
    fn record_provenance(&mut self, record: ProvenanceRecord) -> Result<(), Self::Error>;

    /// Publish everything staged since the last commit.
    fn commit(&mut self) -> Result<(), Self::Error>;

    /// Discard everything staged since the last commit.
    fn rollback(&mut self) -> Result<(), Self::Error>;
}

/// Outbound mail transport.
///
/// No retry is performed behind this trait; a failed send leaves the edits
/// pending and the next scheduling cycle tries again.
pub trait MailTransport {
    /// Error type for delivery failures
    type Error;

    /// Deliver one message, or fail.
    fn send(&mut self, message: &OutboundMessage) -> Result<(), Self::Error>;
}

/// Participant-to-email address encoding.
///
/// Owned by the hosting environment; the core never constructs addresses
/// itself.
pub trait AddressResolver {
    /// The email address behind a participant, or `None` for pure in-system
    /// collaborators that cannot receive email.
    fn recipient_email(&self, participant: &ParticipantId) -> Option<EmailAddress>;

    /// The personal outgoing address used when a digest has exactly one
    /// contributor.
    fn personal_sender_address(&self, participant: &ParticipantId) -> EmailAddress;

    /// The shared group address for a wavelet, derived from its stable
    /// address token.
    fn group_sender_address(&self, address_token: &str) -> EmailAddress;

    /// The blind-copy address that captures replies to a digest, derived
    /// from its correlation message id.
    fn reply_capture_address(&self, message_id: &str) -> EmailAddress;
}
