//! Periodic background trigger for the digest runner

use crate::config::DigestConfig;
use crate::error::DigestError;
use crate::metrics::DigestMetrics;
use crate::runner::DigestRunner;
use std::fmt;
use wavemail_domain::now_millis;
use wavemail_domain::traits::{AddressResolver, MailTransport, WaveletStore};
use wavemail_lock::LockStore;

/// Owns a [`DigestRunner`] and a store, and triggers a batch on a fixed
/// interval until shutdown.
///
/// Each trigger gets a fresh deadline of `max_batch` from its start; a
/// batch that runs long defers its remaining wavelets rather than delaying
/// the next trigger indefinitely.
pub struct DigestWorker<S, R, M, L: LockStore> {
    runner: DigestRunner<R, M, L>,
    store: S,
}

impl<S, R, M, L> DigestWorker<S, R, M, L>
where
    S: WaveletStore,
    S::Error: fmt::Display,
    R: AddressResolver,
    M: MailTransport,
    M::Error: fmt::Display,
    L: LockStore,
{
    /// Wrap a runner and its store.
    pub fn new(runner: DigestRunner<R, M, L>, store: S) -> Self {
        Self { runner, store }
    }

    /// The underlying runner.
    pub fn runner(&self) -> &DigestRunner<R, M, L> {
        &self.runner
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn config(&self) -> &DigestConfig {
        self.runner.config()
    }

    /// Run one batch with a fresh deadline.
    async fn cycle(&mut self) -> Result<DigestMetrics, DigestError> {
        let now = now_millis();
        let deadline = now.saturating_add(self.config().max_batch().as_millis() as u64);
        self.runner.run(&mut self.store, now, deadline).await
    }

    /// Run a fixed number of trigger cycles back to back, without the
    /// interval pacing. Mainly for tests and one-shot invocations.
    pub async fn run_cycles(&mut self, cycles: usize) -> Result<DigestMetrics, DigestError> {
        let mut metrics = DigestMetrics::new();
        for _ in 0..cycles {
            metrics = self.cycle().await?;
        }
        Ok(metrics)
    }

    /// Run until ctrl-c, triggering a batch every `trigger_interval`.
    ///
    /// Storage and commit failures are logged and the loop keeps going; a
    /// transient backend outage should not take the worker down with it.
    pub async fn run(&mut self) -> DigestMetrics {
        let mut ticker = tokio::time::interval(self.config().trigger_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.config().trigger_interval_secs,
            "digest worker started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.cycle().await {
                        Ok(metrics) => {
                            tracing::debug!(
                                wavelets_sent = metrics.wavelets_sent,
                                failures = metrics.failures,
                                "digest cycle complete"
                            );
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "digest cycle failed");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }

        let metrics = self.runner.metrics().clone();
        tracing::info!("\n{}", metrics.summary());
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DigestConfig;
    use wavemail_domain::{
        EditRecord, EmailAddress, OutboundMessage, ParticipantId, WaveletId, WaveletState,
    };
    use wavemail_lock::MemoryLockStore;
    use wavemail_scheduler::{Scheduler, SchedulerConfig};
    use wavemail_store::MemoryWaveletStore;

    struct TestResolver;

    impl AddressResolver for TestResolver {
        fn recipient_email(&self, participant: &ParticipantId) -> Option<EmailAddress> {
            Some(EmailAddress::new(participant.as_str()))
        }
        fn personal_sender_address(&self, participant: &ParticipantId) -> EmailAddress {
            EmailAddress::new(format!("out+{}", participant))
        }
        fn group_sender_address(&self, token: &str) -> EmailAddress {
            EmailAddress::new(format!("group+{token}"))
        }
        fn reply_capture_address(&self, message_id: &str) -> EmailAddress {
            EmailAddress::new(format!("cap+{message_id}"))
        }
    }

    #[derive(Default)]
    struct CountingTransport {
        sent: usize,
    }

    impl MailTransport for CountingTransport {
        type Error = String;
        fn send(&mut self, _message: &OutboundMessage) -> Result<(), String> {
            self.sent += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_cycles_drains_due_wavelet() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let mut store = MemoryWaveletStore::new();

        // An edit submitted long enough ago (in wall-clock terms) that the
        // cycle's `now_millis` is far past every lag.
        let mut wavelet = WaveletState::new(WaveletId::new("wave", "conv"));
        wavelet.add_participant(ParticipantId::new("alice"));
        wavelet.add_participant(ParticipantId::new("bob"));
        let mut edit = EditRecord::new("b+1", ParticipantId::new("alice"), "hello");
        scheduler.record_edit(&mut edit, 1, false, false);
        wavelet.pending_edits.push(edit);
        scheduler.update_schedule(&mut wavelet);
        store.save(&wavelet).unwrap();
        store.commit().unwrap();

        let runner = DigestRunner::new(
            Scheduler::new(SchedulerConfig::default()).unwrap(),
            TestResolver,
            CountingTransport::default(),
            MemoryLockStore::new(),
            DigestConfig::default(),
        )
        .unwrap();
        let mut worker = DigestWorker::new(runner, store);

        let metrics = worker.run_cycles(2).await.unwrap();
        assert_eq!(metrics.runs, 2);
        assert_eq!(metrics.wavelets_sent, 1);
        assert_eq!(worker.runner().transport().sent, 1);
    }

    #[tokio::test]
    async fn test_run_cycles_with_empty_store_is_quiet() {
        let runner = DigestRunner::new(
            Scheduler::new(SchedulerConfig::default()).unwrap(),
            TestResolver,
            CountingTransport::default(),
            MemoryLockStore::new(),
            DigestConfig::default(),
        )
        .unwrap();
        let mut worker = DigestWorker::new(runner, MemoryWaveletStore::new());

        let metrics = worker.run_cycles(3).await.unwrap();
        assert_eq!(metrics.runs, 3);
        assert_eq!(metrics.wavelets_sent, 0);
        assert_eq!(metrics.failures, 0);
    }
}
