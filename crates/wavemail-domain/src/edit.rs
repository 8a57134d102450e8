//! Pending-edit records ("blips")

use crate::address::ParticipantId;
use crate::time::{Timestamp, TIME_UNSET};
use serde::{Deserialize, Serialize};

/// One unsent edit of a sub-document, kept on its parent wavelet until it
/// has been included in a digest email.
///
/// The four event timestamps are written only through the scheduler's
/// `record_edit` path; everything else reads them. `sendable_at` is derived
/// and recomputed on every scheduling pass, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    /// Stable identifier of the sub-document this edit belongs to.
    pub edit_id: String,

    /// Monotonically increasing edit counter.
    pub version: u64,

    /// The participant who created the sub-document.
    pub author: ParticipantId,

    /// Everyone who touched this edit, in first-touch order, deduplicated.
    pub contributors: Vec<ParticipantId>,

    /// Current text snapshot. Never empty: an edit record with empty
    /// content is never created or retained.
    pub content: String,

    /// When the sub-document was first edited. 0 = unset.
    pub first_edited_at: Timestamp,

    /// When the sub-document last changed. 0 = unset.
    pub last_changed_at: Timestamp,

    /// When the sub-document was last submitted. 0 = unset.
    pub last_submitted_at: Timestamp,

    /// When a manual send was last requested. 0 = unset.
    pub manual_send_requested_at: Timestamp,

    /// Derived: earliest time this edit may be emailed. Recomputed on every
    /// scheduling pass, not persisted.
    #[serde(skip)]
    pub sendable_at: Timestamp,
}

impl EditRecord {
    /// Create a fresh edit record for a previously-unseen sub-document.
    pub fn new(edit_id: impl Into<String>, author: ParticipantId, content: impl Into<String>) -> Self {
        let author_clone = author.clone();
        Self {
            edit_id: edit_id.into(),
            version: 0,
            author,
            contributors: vec![author_clone],
            content: content.into(),
            first_edited_at: TIME_UNSET,
            last_changed_at: TIME_UNSET,
            last_submitted_at: TIME_UNSET,
            manual_send_requested_at: TIME_UNSET,
            sendable_at: TIME_UNSET,
        }
    }

    /// Record a contributor, keeping first-touch order and uniqueness.
    pub fn add_contributor(&mut self, participant: ParticipantId) {
        if !self.contributors.contains(&participant) {
            self.contributors.push(participant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_edit_has_author_as_contributor() {
        let edit = EditRecord::new("b+1", ParticipantId::new("alice@example.com"), "hello");
        assert_eq!(edit.contributors.len(), 1);
        assert_eq!(edit.contributors[0].as_str(), "alice@example.com");
    }

    #[test]
    fn test_add_contributor_dedups() {
        let mut edit = EditRecord::new("b+1", ParticipantId::new("alice"), "hello");
        edit.add_contributor(ParticipantId::new("bob"));
        edit.add_contributor(ParticipantId::new("alice"));
        edit.add_contributor(ParticipantId::new("bob"));
        assert_eq!(edit.contributors.len(), 2);
    }

    #[test]
    fn test_sendable_at_not_serialized() {
        let mut edit = EditRecord::new("b+1", ParticipantId::new("alice"), "hello");
        edit.sendable_at = 12345;
        let json = serde_json::to_string(&edit).unwrap();
        let back: EditRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sendable_at, TIME_UNSET);
        assert_eq!(back.content, "hello");
    }
}
