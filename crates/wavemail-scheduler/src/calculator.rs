//! The sendability calculator

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use wavemail_domain::{
    EditRecord, SendMode, Timestamp, WaveletState, IMMEDIATELY_SENDABLE, TIME_INFINITY, TIME_UNSET,
};

/// Computes when pending edits become safe to email.
///
/// All methods except [`record_edit`](Scheduler::record_edit) and
/// [`update_schedule`](Scheduler::update_schedule) are pure reads of the
/// given state; `record_edit` is the only write path for edit timestamps,
/// and `update_schedule` is the only writer of a wavelet's
/// `time_for_sending`.
///
/// # Examples
///
/// ```
/// use wavemail_domain::{EditRecord, ParticipantId, SendMode};
/// use wavemail_scheduler::{Scheduler, SchedulerConfig};
///
/// let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
/// let mut edit = EditRecord::new("b+1", ParticipantId::new("alice"), "hi");
///
/// // Submitted at t=100s: sendable 60s (the submit lag) later.
/// scheduler.record_edit(&mut edit, 100_000, false, false);
/// assert_eq!(scheduler.edit_sendable_at(&edit, SendMode::Automatic), 160_000);
/// ```
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a scheduler, validating the configuration. Invalid timing
    /// parameters are fatal here, before any edit is processed.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Record a live edit/submit event on an edit record.
    ///
    /// Sets `last_changed_at` unconditionally, `first_edited_at` only the
    /// first time, `last_submitted_at` iff the editor is done
    /// (`!still_editing`), and `manual_send_requested_at` iff the event was
    /// an explicit send request. Events for one wavelet must be applied in
    /// arrival order; no reordering correction is performed.
    pub fn record_edit(
        &self,
        edit: &mut EditRecord,
        now: Timestamp,
        still_editing: bool,
        manual_request: bool,
    ) {
        if manual_request {
            edit.manual_send_requested_at = now;
        }
        if edit.first_edited_at == TIME_UNSET {
            edit.first_edited_at = now;
        }
        if !still_editing {
            edit.last_submitted_at = now;
        }
        edit.last_changed_at = now;
    }

    /// The earliest time one edit may be emailed, under the wavelet's send
    /// mode.
    ///
    /// Manual mode: [`IMMEDIATELY_SENDABLE`] when a send was requested and
    /// nothing changed since (a request at the same instant as the change
    /// counts), otherwise never. Automatic mode: the quiet-period rule while
    /// someone is still editing, the submit-lag rule once everyone
    /// submitted, and in either case never later than the lifetime cap past
    /// the first edit.
    pub fn edit_sendable_at(&self, edit: &EditRecord, mode: SendMode) -> Timestamp {
        match mode {
            SendMode::Manual => {
                if edit.manual_send_requested_at != TIME_UNSET
                    && edit.manual_send_requested_at >= edit.last_changed_at
                {
                    IMMEDIATELY_SENDABLE
                } else {
                    TIME_INFINITY
                }
            }
            SendMode::Automatic => {
                let candidate = if edit.last_changed_at > edit.last_submitted_at {
                    // Someone is still editing: wait for a quiet period.
                    edit.last_changed_at.saturating_add(self.config.no_edit_lag_ms())
                } else {
                    // Submitted by all editing parties.
                    edit.last_submitted_at.saturating_add(self.config.submit_lag_ms())
                };
                // The lifetime cap wins over either debounce rule.
                candidate.min(
                    edit.first_edited_at
                        .saturating_add(self.config.max_edit_lifetime_ms()),
                )
            }
        }
    }

    /// The wavelet's next-action time: the earliest sendable time over its
    /// pending edits, floored by the minimum send interval since the last
    /// digest. [`TIME_INFINITY`] when nothing is pending.
    ///
    /// Pure: does not mutate the wavelet or its edits.
    pub fn next_send_time(&self, wavelet: &WaveletState) -> Timestamp {
        let mut next = TIME_INFINITY;
        for edit in &wavelet.pending_edits {
            next = next.min(self.edit_sendable_at(edit, wavelet.send_mode));
        }
        // The interval floor only exists once a digest has gone out; a
        // wavelet that never sent has nothing to throttle against.
        if wavelet.last_email_sent_at != TIME_UNSET {
            next = next.max(
                wavelet
                    .last_email_sent_at
                    .saturating_add(self.config.min_send_interval_ms()),
            );
        }
        next
    }

    /// Refresh every pending edit's derived `sendable_at` and store the
    /// recomputed next-action time in `time_for_sending`. This is the only
    /// writer of `time_for_sending`.
    pub fn update_schedule(&self, wavelet: &mut WaveletState) {
        let mode = wavelet.send_mode;
        for edit in &mut wavelet.pending_edits {
            edit.sendable_at = self.edit_sendable_at(edit, mode);
        }
        let next = self.next_send_time(wavelet);
        tracing::debug!(
            wavelet = %wavelet.id,
            time_for_sending = next,
            pending = wavelet.pending_edits.len(),
            "schedule updated"
        );
        wavelet.time_for_sending = next;
    }
}
