//! Wavemail Lock
//!
//! Generic best-effort mutual exclusion over a shared expiring-key store.
//!
//! Multiple workers (live edit processing and the periodic digest job) may
//! touch the same wavelet concurrently with no shared memory; this crate
//! serializes them through whatever add-if-absent key/value store the
//! deployment offers. The lock is an expiring lease, not a consensus
//! protocol: if a holder crashes or overruns its processing timeout, the
//! key expires and another worker may proceed. Liveness over strict safety.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use wavemail_lock::{LockManager, LockOutcome, MemoryLockStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = LockManager::new(MemoryLockStore::new());
//! let outcome = manager
//!     .execute_in_lock(
//!         "wavelet/w c",
//!         Duration::from_millis(500),
//!         Duration::from_secs(10),
//!         false,
//!         || 2 + 2,
//!     )
//!     .await;
//! assert!(matches!(outcome, LockOutcome::Completed { result: 4, .. }));
//! # }
//! ```

#![warn(missing_docs)]

mod manager;
mod store;

pub use manager::{LockManager, LockOutcome};
pub use store::{LockStore, MemoryLockStore};
