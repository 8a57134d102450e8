//! The digest batch runner
//!
//! One `run` call scans for due wavelets and processes each as an isolated
//! unit: lock, re-validate, send, advance state, commit. A unit that fails
//! is rolled back and left for the next trigger; the rest of the batch
//! continues.

use crate::config::DigestConfig;
use crate::error::DigestError;
use crate::message::compose_digest;
use crate::metrics::DigestMetrics;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use wavemail_domain::traits::{AddressResolver, MailTransport, WaveletStore};
use wavemail_domain::{
    now_millis, EditRecord, EmailAddress, ProvenanceRecord, Timestamp, WaveletId,
};
use wavemail_lock::{LockManager, LockOutcome, LockStore};
use wavemail_scheduler::{interested_recipients, Scheduler};

/// What happened to one wavelet inside its processing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaveletReport {
    /// Digests went out; pending edits were consumed.
    Sent { digests: usize, edits: usize },
    /// Re-validation under the lock found nothing due. The refreshed
    /// schedule is still committed.
    NotDue,
    /// The due scan returned an id with no stored state behind it.
    Missing,
}

/// Drives digest assembly and delivery for due wavelets.
///
/// Holds the sendability scheduler, the address resolver, the mail
/// transport and the per-wavelet lock manager; the store is passed per
/// `run` so the same runner can serve tests and the background worker
/// unchanged.
pub struct DigestRunner<R, M, L: LockStore> {
    scheduler: Scheduler,
    resolver: R,
    transport: M,
    lock: LockManager<L>,
    config: DigestConfig,
    metrics: DigestMetrics,
}

impl<R, M, L> DigestRunner<R, M, L>
where
    R: AddressResolver,
    M: MailTransport,
    M::Error: fmt::Display,
    L: LockStore,
{
    /// Create a runner, validating the digest configuration up front.
    pub fn new(
        scheduler: Scheduler,
        resolver: R,
        transport: M,
        lock_store: L,
        config: DigestConfig,
    ) -> Result<Self, crate::DigestConfigError> {
        config.validate()?;
        Ok(Self {
            scheduler,
            resolver,
            transport,
            lock: LockManager::new(lock_store),
            config,
            metrics: DigestMetrics::new(),
        })
    }

    /// The active digest configuration.
    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Counters accumulated since construction.
    pub fn metrics(&self) -> &DigestMetrics {
        &self.metrics
    }

    /// The mail transport (tests inspect what was sent through it).
    pub fn transport(&self) -> &M {
        &self.transport
    }

    /// Process every wavelet due at `now`, stopping early once the
    /// wall-clock `deadline` (epoch ms) passes. Wavelets left over are
    /// counted as deferred and picked up by the next trigger.
    ///
    /// Per-wavelet delivery and recipient failures are rolled back,
    /// counted and skipped; storage and commit failures abort the batch.
    /// Returns a snapshot of the accumulated metrics.
    pub async fn run<S>(
        &mut self,
        store: &mut S,
        now: Timestamp,
        deadline: Timestamp,
    ) -> Result<DigestMetrics, DigestError>
    where
        S: WaveletStore,
        S::Error: fmt::Display,
    {
        let Self {
            scheduler,
            resolver,
            transport,
            lock,
            config,
            metrics,
        } = self;
        metrics.runs += 1;

        let due = store
            .due_wavelets(now)
            .map_err(|e| DigestError::Store(e.to_string()))?;
        tracing::debug!(due = due.len(), now, "digest batch starting");

        for (position, id) in due.iter().enumerate() {
            if now_millis() >= deadline {
                let deferred = due.len() - position;
                metrics.deferred_by_deadline += deferred;
                tracing::info!(deferred, "batch deadline reached; deferring the rest");
                break;
            }

            let key = format!("wavelet/{}", id.storage_key());
            let outcome = lock
                .execute_in_lock(
                    &key,
                    config.lock_wait(),
                    config.lock_ttl(),
                    config.run_anyway,
                    || {
                        match process_wavelet(scheduler, resolver, &mut *transport, &mut *store, id, now)
                        {
                            Ok(report) => {
                                store
                                    .commit()
                                    .map_err(|e| DigestError::Commit(e.to_string()))?;
                                Ok(report)
                            }
                            Err(err) => {
                                if let Err(rollback_err) = store.rollback() {
                                    tracing::error!(
                                        wavelet = %id,
                                        error = %rollback_err,
                                        "rollback failed after processing error"
                                    );
                                }
                                Err(err)
                            }
                        }
                    },
                )
                .await;

            match outcome {
                LockOutcome::Skipped => {
                    metrics.skipped_lock_busy += 1;
                    tracing::debug!(wavelet = %id, "lock busy; wavelet deferred to next cycle");
                }
                LockOutcome::Completed { result, .. } => match result {
                    Ok(WaveletReport::Sent { digests, edits }) => {
                        metrics.wavelets_sent += 1;
                        metrics.digests_sent += digests;
                        metrics.edits_sent += edits;
                    }
                    Ok(WaveletReport::NotDue) | Ok(WaveletReport::Missing) => {
                        metrics.skipped_not_due += 1;
                    }
                    Err(
                        err @ (DigestError::Delivery { .. } | DigestError::NoRecipients { .. }),
                    ) => {
                        metrics.failures += 1;
                        tracing::warn!(
                            wavelet = %id,
                            error = %err,
                            "wavelet digest failed; its edits stay pending"
                        );
                    }
                    Err(err) => return Err(err),
                },
            }
        }

        Ok(metrics.clone())
    }
}

/// One wavelet's processing unit: load, re-validate, group, send, advance.
///
/// Everything staged through `store` belongs to the caller's transaction;
/// this function never commits or rolls back itself. Sends run in a pass
/// of their own before any state is mutated, so a delivery failure leaves
/// the wavelet exactly as loaded.
fn process_wavelet<S, R, M>(
    scheduler: &Scheduler,
    resolver: &R,
    transport: &mut M,
    store: &mut S,
    id: &WaveletId,
    now: Timestamp,
) -> Result<WaveletReport, DigestError>
where
    S: WaveletStore,
    S::Error: fmt::Display,
    R: AddressResolver,
    M: MailTransport,
    M::Error: fmt::Display,
{
    let Some(mut wavelet) = store
        .load(id)
        .map_err(|e| DigestError::Store(e.to_string()))?
    else {
        tracing::warn!(wavelet = %id, "due wavelet has no stored state");
        return Ok(WaveletReport::Missing);
    };

    // The due scan ran without the lock; a concurrent edit may have pushed
    // the schedule out since. Recompute before trusting it.
    scheduler.update_schedule(&mut wavelet);
    if wavelet.time_for_sending > now {
        store
            .save(&wavelet)
            .map_err(|e| DigestError::Store(e.to_string()))?;
        return Ok(WaveletReport::NotDue);
    }

    let sendable: Vec<usize> = wavelet
        .pending_edits
        .iter()
        .enumerate()
        .filter(|(_, edit)| edit.sendable_at <= now)
        .map(|(i, _)| i)
        .collect();
    if sendable.is_empty() {
        store
            .save(&wavelet)
            .map_err(|e| DigestError::Store(e.to_string()))?;
        return Ok(WaveletReport::NotDue);
    }

    // Group sendable edits per interested recipient. BTreeMap keeps the
    // send order deterministic, so a retried pass regroups identically.
    let mut per_recipient: BTreeMap<EmailAddress, Vec<usize>> = BTreeMap::new();
    for &i in &sendable {
        let edit = &wavelet.pending_edits[i];
        let recipients = interested_recipients(resolver, &edit.author, &wavelet.participants);
        if recipients.is_empty() {
            return Err(DigestError::NoRecipients {
                edit_id: edit.edit_id.clone(),
            });
        }
        for recipient in recipients {
            per_recipient.entry(recipient).or_default().push(i);
        }
    }

    let message_id = ProvenanceRecord::new_message_id(&wavelet.address_token);
    let capture = resolver.reply_capture_address(&message_id);

    // Send pass: read-only over the wavelet. A failure aborts the unit
    // with no state advanced and the next cycle retries everything.
    for (recipient, indices) in &per_recipient {
        let edits: Vec<&EditRecord> = indices.iter().map(|&i| &wavelet.pending_edits[i]).collect();
        let message = compose_digest(resolver, &wavelet, &edits, recipient, &capture);
        transport.send(&message).map_err(|e| DigestError::Delivery {
            recipient: recipient.clone(),
            reason: e.to_string(),
        })?;
    }

    // All sends succeeded: consume the edits (each exactly once, however
    // many digests it appeared in) and advance the wavelet.
    let digests = per_recipient.len();
    let edits_sent = sendable.len();
    let sent_ids: BTreeSet<String> = sendable
        .iter()
        .map(|&i| wavelet.pending_edits[i].edit_id.clone())
        .collect();
    wavelet.pending_edits.retain(|e| !sent_ids.contains(&e.edit_id));
    wavelet.last_email_sent_at = now;
    scheduler.update_schedule(&mut wavelet);

    store
        .save(&wavelet)
        .map_err(|e| DigestError::Store(e.to_string()))?;
    store
        .record_provenance(ProvenanceRecord {
            message_id,
            wavelet: id.clone(),
            recipients: per_recipient.keys().cloned().collect(),
            sent_at: now,
        })
        .map_err(|e| DigestError::Store(e.to_string()))?;

    tracing::info!(wavelet = %id, digests, edits = edits_sent, "digest pass sent");
    Ok(WaveletReport::Sent {
        digests,
        edits: edits_sent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavemail_domain::{OutboundMessage, ParticipantId, SendMode, WaveletState};
    use wavemail_lock::MemoryLockStore;
    use wavemail_scheduler::SchedulerConfig;
    use wavemail_store::MemoryWaveletStore;

    const SEC: u64 = 1000;
    const FAR_DEADLINE: u64 = u64::MAX;

    struct TestResolver;

    impl AddressResolver for TestResolver {
        fn recipient_email(&self, participant: &ParticipantId) -> Option<EmailAddress> {
            participant
                .as_str()
                .contains('@')
                .then(|| EmailAddress::new(participant.as_str()))
        }
        fn personal_sender_address(&self, participant: &ParticipantId) -> EmailAddress {
            EmailAddress::new(format!("out+{}", participant))
        }
        fn group_sender_address(&self, token: &str) -> EmailAddress {
            EmailAddress::new(format!("group+{token}@wavemail.example"))
        }
        fn reply_capture_address(&self, message_id: &str) -> EmailAddress {
            EmailAddress::new(format!("{message_id}@capture.example"))
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<OutboundMessage>,
        fail_for: Option<EmailAddress>,
    }

    impl MailTransport for RecordingTransport {
        type Error = String;
        fn send(&mut self, message: &OutboundMessage) -> Result<(), String> {
            if let Some(bad) = &self.fail_for {
                if message.to.contains(bad) {
                    return Err("mailbox unavailable".to_string());
                }
            }
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn runner(
        transport: RecordingTransport,
    ) -> DigestRunner<TestResolver, RecordingTransport, MemoryLockStore> {
        DigestRunner::new(
            Scheduler::new(SchedulerConfig::default()).unwrap(),
            TestResolver,
            transport,
            MemoryLockStore::new(),
            DigestConfig::default(),
        )
        .unwrap()
    }

    /// A wavelet with alice and bob, one submitted edit by alice at t, and
    /// a schedule already computed and committed.
    fn seed_wavelet(store: &mut MemoryWaveletStore, t: u64) -> WaveletId {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let id = WaveletId::new("wave", "conv");
        let mut wavelet = WaveletState::new(id.clone());
        wavelet.add_participant(ParticipantId::new("alice@example.com"));
        wavelet.add_participant(ParticipantId::new("bob@example.com"));

        let mut edit = EditRecord::new(
            "b+1",
            ParticipantId::new("alice@example.com"),
            "hello bob",
        );
        scheduler.record_edit(&mut edit, t, false, false);
        wavelet.pending_edits.push(edit);
        scheduler.update_schedule(&mut wavelet);

        store.save(&wavelet).unwrap();
        store.commit().unwrap();
        id
    }

    #[tokio::test]
    async fn test_due_wavelet_sends_and_consumes_edits() {
        let mut store = MemoryWaveletStore::new();
        let id = seed_wavelet(&mut store, 100 * SEC);
        let mut runner = runner(RecordingTransport::default());

        // Well past the 60s submit lag.
        let metrics = runner
            .run(&mut store, 200 * SEC, FAR_DEADLINE)
            .await
            .unwrap();

        assert_eq!(metrics.wavelets_sent, 1);
        assert_eq!(metrics.digests_sent, 1);
        assert_eq!(metrics.edits_sent, 1);
        assert_eq!(runner.transport().sent.len(), 1);
        assert_eq!(
            runner.transport().sent[0].to,
            vec![EmailAddress::new("bob@example.com")]
        );

        let wavelet = store.load(&id).unwrap().unwrap();
        assert!(wavelet.pending_edits.is_empty());
        assert_eq!(wavelet.last_email_sent_at, 200 * SEC);
        assert_eq!(store.provenance().len(), 1);
    }

    #[tokio::test]
    async fn test_not_yet_due_wavelet_is_skipped() {
        let mut store = MemoryWaveletStore::new();
        seed_wavelet(&mut store, 100 * SEC);
        let mut runner = runner(RecordingTransport::default());

        // 30s after submit: inside the 60s submit lag, nothing due.
        let metrics = runner
            .run(&mut store, 130 * SEC, FAR_DEADLINE)
            .await
            .unwrap();

        assert_eq!(metrics.wavelets_sent, 0);
        assert!(runner.transport().sent.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_rolls_back_and_counts() {
        let mut store = MemoryWaveletStore::new();
        let id = seed_wavelet(&mut store, 100 * SEC);
        let mut runner = runner(RecordingTransport {
            fail_for: Some(EmailAddress::new("bob@example.com")),
            ..Default::default()
        });

        let metrics = runner
            .run(&mut store, 200 * SEC, FAR_DEADLINE)
            .await
            .unwrap();

        assert_eq!(metrics.failures, 1);
        assert_eq!(metrics.wavelets_sent, 0);

        // Nothing advanced: the edit is still pending, no provenance.
        let wavelet = store.load(&id).unwrap().unwrap();
        assert_eq!(wavelet.pending_edits.len(), 1);
        assert_eq!(wavelet.last_email_sent_at, wavemail_domain::TIME_UNSET);
        assert!(store.provenance().is_empty());
    }

    #[tokio::test]
    async fn test_busy_lock_defers_wavelet() {
        let mut store = MemoryWaveletStore::new();
        let id = seed_wavelet(&mut store, 100 * SEC);

        let lock_store = MemoryLockStore::new();
        assert!(lock_store.try_acquire(
            &format!("wavelet/{}", id.storage_key()),
            std::time::Duration::from_secs(60)
        ));

        let mut runner = DigestRunner::new(
            Scheduler::new(SchedulerConfig::default()).unwrap(),
            TestResolver,
            RecordingTransport::default(),
            lock_store,
            DigestConfig {
                lock_wait_ms: 50,
                ..Default::default()
            },
        )
        .unwrap();

        let metrics = runner
            .run(&mut store, 200 * SEC, FAR_DEADLINE)
            .await
            .unwrap();
        assert_eq!(metrics.skipped_lock_busy, 1);
        assert!(runner.transport().sent.is_empty());
    }

    #[tokio::test]
    async fn test_past_deadline_defers_everything() {
        let mut store = MemoryWaveletStore::new();
        seed_wavelet(&mut store, 100 * SEC);
        let mut runner = runner(RecordingTransport::default());

        // Deadline in the past: the whole batch is deferred untouched.
        let metrics = runner.run(&mut store, 200 * SEC, 0).await.unwrap();
        assert_eq!(metrics.deferred_by_deadline, 1);
        assert!(runner.transport().sent.is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_aborts_batch() {
        let mut store = MemoryWaveletStore::new();
        seed_wavelet(&mut store, 100 * SEC);
        store.induce_commit_failure();
        let mut runner = runner(RecordingTransport::default());

        let err = runner
            .run(&mut store, 200 * SEC, FAR_DEADLINE)
            .await
            .unwrap_err();
        assert!(matches!(err, DigestError::Commit(_)));
    }

    #[tokio::test]
    async fn test_manual_mode_waits_for_request() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let mut store = MemoryWaveletStore::new();
        let id = WaveletId::new("wave", "conv");
        let mut wavelet = WaveletState::new(id.clone());
        wavelet.send_mode = SendMode::Manual;
        wavelet.add_participant(ParticipantId::new("alice@example.com"));
        wavelet.add_participant(ParticipantId::new("bob@example.com"));

        let mut edit = EditRecord::new("b+1", ParticipantId::new("alice@example.com"), "draft");
        scheduler.record_edit(&mut edit, 100 * SEC, false, false);
        wavelet.pending_edits.push(edit);
        scheduler.update_schedule(&mut wavelet);
        store.save(&wavelet).unwrap();
        store.commit().unwrap();

        // No send request yet: never due, regardless of elapsed time.
        let mut runner = runner(RecordingTransport::default());
        let metrics = runner
            .run(&mut store, 100_000 * SEC, FAR_DEADLINE)
            .await
            .unwrap();
        assert_eq!(metrics.wavelets_sent, 0);

        // After the request the very next run sends.
        let mut wavelet = store.load(&id).unwrap().unwrap();
        let edit = wavelet.find_edit_mut("b+1").unwrap();
        scheduler.record_edit(edit, 100_001 * SEC, false, true);
        scheduler.update_schedule(&mut wavelet);
        store.save(&wavelet).unwrap();
        store.commit().unwrap();

        let metrics = runner
            .run(&mut store, 100_002 * SEC, FAR_DEADLINE)
            .await
            .unwrap();
        assert_eq!(metrics.wavelets_sent, 1);
        assert_eq!(runner.transport().sent.len(), 1);
    }
}
