//! Wavemail Digest
//!
//! The periodic digest job: finds wavelets whose next-action time has
//! arrived, assembles one plain-text digest per interested recipient from
//! the sendable pending edits, delivers them, and advances the wavelet's
//! state, all under a per-wavelet lock and a per-wavelet transaction.
//!
//! # Processing model
//!
//! A batch trigger (periodic or on demand) scans for due wavelets without
//! any lock, then handles each wavelet as an isolated unit:
//!
//! 1. acquire the wavelet's lock (skip the wavelet this cycle if busy)
//! 2. reload and re-validate the schedule under the lock
//! 3. group sendable edits per interested recipient and send, read-only
//! 4. on full success, consume the edits, stamp the send time, record
//!    provenance and commit; on any failure, roll back
//!
//! A failed unit costs nothing but a delay: its edits stay pending and the
//! next trigger retries. Batches are bounded by a wall-clock deadline so a
//! backlog degrades into deferral, not an ever-longer cycle.

#![warn(missing_docs)]

mod config;
mod error;
mod message;
mod metrics;
mod runner;
mod worker;

pub use config::{DigestConfig, DigestConfigError};
pub use error::DigestError;
pub use message::{compose_digest, digest_subject, EMPTY_SUBJECT_PLACEHOLDER};
pub use metrics::DigestMetrics;
pub use runner::DigestRunner;
pub use worker::DigestWorker;
