//! Demo digest worker over an in-memory store.
//!
//! Seeds one wavelet with a submitted edit that is already past its submit
//! lag, then runs the periodic worker; the first trigger sends the digest
//! and later triggers find nothing due. Stop with ctrl-c.
//!
//! ```text
//! RUST_LOG=debug cargo run --example digest_worker
//! ```

use wavemail_digest::{DigestConfig, DigestRunner, DigestWorker};
use wavemail_domain::traits::{AddressResolver, MailTransport, WaveletStore};
use wavemail_domain::{
    now_millis, EditRecord, EmailAddress, OutboundMessage, ParticipantId, WaveletId, WaveletState,
};
use wavemail_lock::MemoryLockStore;
use wavemail_scheduler::{Scheduler, SchedulerConfig};
use wavemail_store::MemoryWaveletStore;

/// Every participant id doubles as an email address; senders get fixed
/// demo encodings.
struct DemoResolver;

impl AddressResolver for DemoResolver {
    fn recipient_email(&self, participant: &ParticipantId) -> Option<EmailAddress> {
        Some(EmailAddress::new(participant.as_str()))
    }
    fn personal_sender_address(&self, participant: &ParticipantId) -> EmailAddress {
        EmailAddress::new(format!("{}+wave@demo.example", participant))
    }
    fn group_sender_address(&self, address_token: &str) -> EmailAddress {
        EmailAddress::new(format!("wavelet+{address_token}@demo.example"))
    }
    fn reply_capture_address(&self, message_id: &str) -> EmailAddress {
        EmailAddress::new(format!("{message_id}@demo.example"))
    }
}

/// Logs instead of delivering.
struct LogTransport;

impl MailTransport for LogTransport {
    type Error = std::convert::Infallible;

    fn send(&mut self, message: &OutboundMessage) -> Result<(), Self::Error> {
        tracing::info!(
            from = %message.from,
            to = %message.to[0],
            subject = %message.subject,
            "would deliver:\n{}",
            message.body
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let scheduler = Scheduler::new(SchedulerConfig::default())?;

    let mut store = MemoryWaveletStore::new();
    let mut wavelet = WaveletState::new(WaveletId::new("wave+demo", "conv+root"));
    wavelet.title = "Digest worker demo".to_string();
    wavelet.add_participant(ParticipantId::new("alice@demo.example"));
    wavelet.add_participant(ParticipantId::new("bob@demo.example"));

    // Submitted two minutes ago: well past the default 60s submit lag.
    let submitted_at = now_millis().saturating_sub(120_000);
    let mut edit = EditRecord::new(
        "b+demo",
        ParticipantId::new("alice@demo.example"),
        "Hello Bob, the new draft is up.",
    );
    scheduler.record_edit(&mut edit, submitted_at, false, false);
    wavelet.pending_edits.push(edit);
    scheduler.update_schedule(&mut wavelet);
    store.save(&wavelet)?;
    store.commit()?;

    let config = DigestConfig {
        trigger_interval_secs: 5,
        ..Default::default()
    };
    let runner = DigestRunner::new(scheduler, DemoResolver, LogTransport, MemoryLockStore::new(), config)?;
    let mut worker = DigestWorker::new(runner, store);

    worker.run().await;
    Ok(())
}
