//! Application of live document events to wavelet state
//!
//! The event source delivers one notification per live interaction; this
//! module turns each into the corresponding state update and refreshes the
//! wavelet's schedule. Events for one wavelet must arrive in order.

use crate::calculator::Scheduler;
use wavemail_domain::{EditRecord, ParticipantId, Timestamp, WaveletState};

/// One live notification from the collaborative-document event source.
#[derive(Debug, Clone)]
pub enum WaveletEvent {
    /// A sub-document changed while someone is still editing it.
    EditChanged {
        /// Target sub-document.
        edit_id: String,
        /// The acting participant.
        participant: ParticipantId,
        /// New full text snapshot.
        content: String,
    },
    /// A sub-document was submitted (the editor is done for now).
    Submitted {
        /// Target sub-document.
        edit_id: String,
        /// The acting participant.
        participant: ParticipantId,
    },
    /// The user explicitly asked for this sub-document to be emailed.
    ManualSendRequested {
        /// Target sub-document.
        edit_id: String,
        /// The acting participant.
        participant: ParticipantId,
    },
    /// A participant joined the wavelet.
    ParticipantAdded {
        /// The new participant.
        participant: ParticipantId,
    },
    /// A participant left the wavelet.
    ParticipantRemoved {
        /// The departing participant.
        participant: ParticipantId,
    },
}

/// Apply one event to a wavelet and refresh its schedule.
///
/// Edit records are created lazily on the first content-bearing change of a
/// sub-document; a change that leaves a sub-document empty removes its
/// pending record rather than retaining an empty one. Submit and
/// manual-send events for sub-documents with nothing pending are ignored.
pub fn apply_event(
    scheduler: &Scheduler,
    wavelet: &mut WaveletState,
    event: WaveletEvent,
    now: Timestamp,
) {
    match event {
        WaveletEvent::EditChanged {
            edit_id,
            participant,
            content,
        } => {
            if content.is_empty() {
                let before = wavelet.pending_edits.len();
                wavelet.pending_edits.retain(|e| e.edit_id != edit_id);
                if wavelet.pending_edits.len() != before {
                    tracing::debug!(%edit_id, "pending edit emptied, record dropped");
                }
            } else if let Some(edit) = wavelet.find_edit_mut(&edit_id) {
                edit.content = content;
                edit.version += 1;
                edit.add_contributor(participant);
                scheduler.record_edit(edit, now, true, false);
            } else {
                let mut edit = EditRecord::new(edit_id, participant, content);
                scheduler.record_edit(&mut edit, now, true, false);
                wavelet.pending_edits.push(edit);
            }
        }
        WaveletEvent::Submitted {
            edit_id,
            participant,
        } => {
            if let Some(edit) = wavelet.find_edit_mut(&edit_id) {
                edit.add_contributor(participant);
                scheduler.record_edit(edit, now, false, false);
            } else {
                tracing::debug!(%edit_id, "submit for sub-document with nothing pending");
            }
        }
        WaveletEvent::ManualSendRequested {
            edit_id,
            participant,
        } => {
            if let Some(edit) = wavelet.find_edit_mut(&edit_id) {
                edit.add_contributor(participant);
                scheduler.record_edit(edit, now, true, true);
            } else {
                tracing::debug!(%edit_id, "manual send for sub-document with nothing pending");
            }
        }
        WaveletEvent::ParticipantAdded { participant } => {
            wavelet.add_participant(participant);
        }
        WaveletEvent::ParticipantRemoved { participant } => {
            wavelet.remove_participant(&participant);
        }
    }
    scheduler.update_schedule(wavelet);
}
