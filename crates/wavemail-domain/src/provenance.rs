//! Provenance records for outgoing digests

use crate::address::EmailAddress;
use crate::time::Timestamp;
use crate::wavelet::WaveletId;
use serde::{Deserialize, Serialize};

/// Append-only record correlating one outgoing digest pass with the wavelet
/// it came from, so that a later inbound reply (captured via the bcc'd
/// correlation address) can be routed back to the right thread.
///
/// Created atomically with the send attempt and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Synthetic message id embedding the wavelet's address token.
    pub message_id: String,

    /// The wavelet the digest was assembled from.
    pub wavelet: WaveletId,

    /// Every recipient the digest pass was sent to (thread references for
    /// reply routing).
    pub recipients: Vec<EmailAddress>,

    /// When the digest pass completed.
    pub sent_at: Timestamp,
}

impl ProvenanceRecord {
    /// Build the synthetic message id for a digest pass.
    ///
    /// The wavelet's stable token is embedded so an inbound reply can be
    /// correlated without a lookup table; the random suffix keeps ids from
    /// different passes distinct.
    pub fn new_message_id(address_token: &str) -> String {
        format!("wavemail+{}+{}", address_token, uuid::Uuid::new_v4().simple())
    }

    /// Extract the wavelet address token from a message id produced by
    /// [`new_message_id`](Self::new_message_id). Returns `None` for foreign
    /// message ids.
    pub fn token_from_message_id(message_id: &str) -> Option<&str> {
        let rest = message_id.strip_prefix("wavemail+")?;
        let (token, _suffix) = rest.split_once('+')?;
        Some(token)
    }
}
