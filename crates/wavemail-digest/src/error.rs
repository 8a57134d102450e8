//! Error types for digest assembly and sending

use thiserror::Error;
use wavemail_domain::EmailAddress;

/// Errors from one wavelet's digest-processing unit.
///
/// `Delivery` and `NoRecipients` abort only the affected wavelet (its edits
/// stay pending for the next cycle); `Commit` is a persistence failure and
/// propagates to the batch caller.
#[derive(Error, Debug)]
pub enum DigestError {
    /// The persistence collaborator failed a read or staged write.
    #[error("Storage error: {0}")]
    Store(String),

    /// The persistence collaborator failed to commit the processing unit.
    #[error("Commit failed: {0}")]
    Commit(String),

    /// The mail transport rejected a send. Recoverable: nothing was
    /// advanced, the next cycle retries.
    #[error("Delivery to {recipient} failed: {reason}")]
    Delivery {
        /// The recipient whose send failed.
        recipient: EmailAddress,
        /// Transport-reported reason.
        reason: String,
    },

    /// A sendable edit resolved to zero interested recipients. It should
    /// never have become sendable without at least one; failing loudly
    /// beats silently dropping content.
    #[error("Sendable edit {edit_id} has no interested recipients")]
    NoRecipients {
        /// The offending sub-document id.
        edit_id: String,
    },
}
