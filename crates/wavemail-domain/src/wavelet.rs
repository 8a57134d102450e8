//! Wavelet aggregate state

use crate::address::ParticipantId;
use crate::edit::EditRecord;
use crate::time::{Timestamp, TIME_INFINITY, TIME_UNSET};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite identity of a wavelet: the document thread id plus the
/// document-instance id within it.
///
/// The two fields are kept separate at the API boundary; `storage_key`
/// renders the opaque composite form used as a persistence key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WaveletId {
    /// The document-thread ("wave") id.
    pub wave_id: String,
    /// The document-instance ("wavelet") id within the thread.
    pub wavelet_id: String,
}

impl WaveletId {
    /// Build an id from its two parts.
    pub fn new(wave_id: impl Into<String>, wavelet_id: impl Into<String>) -> Self {
        Self {
            wave_id: wave_id.into(),
            wavelet_id: wavelet_id.into(),
        }
    }

    /// The opaque composite key used by persistence and lock keys.
    pub fn storage_key(&self) -> String {
        format!("{} {}", self.wave_id, self.wavelet_id)
    }

    /// Split a composite key back into its parts. Returns `None` if the
    /// key does not contain the separator.
    pub fn parse(key: &str) -> Option<Self> {
        let (wave_id, wavelet_id) = key.split_once(' ')?;
        Some(Self::new(wave_id, wavelet_id))
    }
}

impl fmt::Display for WaveletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.wave_id, self.wavelet_id)
    }
}

/// Whether digests go out on the automatic debounce schedule or only on an
/// explicit user request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    /// Debounce rules decide when edits become sendable.
    Automatic,
    /// Edits are sendable only after an explicit send request.
    Manual,
}

/// Aggregate state for one wavelet: its participants and the edits that
/// have not yet been emailed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveletState {
    /// Composite identity.
    pub id: WaveletId,

    /// Automatic or manual sending.
    pub send_mode: SendMode,

    /// When the last digest was successfully sent. 0 = never.
    pub last_email_sent_at: Timestamp,

    /// Next-action time, recomputed from `pending_edits` by the scheduler.
    /// `TIME_INFINITY` when nothing is pending. Never written directly by
    /// edit-processing code.
    pub time_for_sending: Timestamp,

    /// Current title, used as the digest subject.
    pub title: String,

    /// Stable random token embedded in the wavelet's group sender and
    /// reply-capture addresses.
    pub address_token: String,

    /// Participants, in join order, deduplicated.
    pub participants: Vec<ParticipantId>,

    /// Unsent edits, ordered by first-edit time.
    pub pending_edits: Vec<EditRecord>,
}

impl WaveletState {
    /// Create an empty wavelet in automatic mode with a fresh address token.
    pub fn new(id: WaveletId) -> Self {
        Self {
            id,
            send_mode: SendMode::Automatic,
            last_email_sent_at: TIME_UNSET,
            time_for_sending: TIME_INFINITY,
            title: String::new(),
            address_token: uuid::Uuid::new_v4().simple().to_string(),
            participants: Vec::new(),
            pending_edits: Vec::new(),
        }
    }

    /// Add a participant, keeping join order and uniqueness.
    pub fn add_participant(&mut self, participant: ParticipantId) {
        if !self.participants.contains(&participant) {
            self.participants.push(participant);
        }
    }

    /// Remove a participant.
    pub fn remove_participant(&mut self, participant: &ParticipantId) {
        self.participants.retain(|p| p != participant);
    }

    /// Find a pending edit by sub-document id.
    pub fn find_edit_mut(&mut self, edit_id: &str) -> Option<&mut EditRecord> {
        self.pending_edits.iter_mut().find(|e| e.edit_id == edit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_roundtrip() {
        let id = WaveletId::new("wave+1", "conv+root");
        let key = id.storage_key();
        assert_eq!(key, "wave+1 conv+root");
        assert_eq!(WaveletId::parse(&key), Some(id));
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert_eq!(WaveletId::parse("no-separator"), None);
    }

    #[test]
    fn test_new_wavelet_defaults() {
        let w = WaveletState::new(WaveletId::new("w", "c"));
        assert_eq!(w.send_mode, SendMode::Automatic);
        assert_eq!(w.last_email_sent_at, TIME_UNSET);
        assert_eq!(w.time_for_sending, TIME_INFINITY);
        assert!(!w.address_token.is_empty());
        assert!(w.pending_edits.is_empty());
    }

    #[test]
    fn test_address_tokens_are_unique() {
        let a = WaveletState::new(WaveletId::new("w", "a"));
        let b = WaveletState::new(WaveletId::new("w", "b"));
        assert_ne!(a.address_token, b.address_token);
    }

    #[test]
    fn test_participants_dedup_and_remove() {
        let mut w = WaveletState::new(WaveletId::new("w", "c"));
        w.add_participant(ParticipantId::new("alice"));
        w.add_participant(ParticipantId::new("bob"));
        w.add_participant(ParticipantId::new("alice"));
        assert_eq!(w.participants.len(), 2);

        w.remove_participant(&ParticipantId::new("alice"));
        assert_eq!(w.participants.len(), 1);
        assert_eq!(w.participants[0].as_str(), "bob");
    }
}
