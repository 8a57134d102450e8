//! Exclusive execution of keyed actions

use crate::store::LockStore;
use std::time::{Duration, Instant};

/// How an `execute_in_lock` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome<T> {
    /// The action ran to completion.
    Completed {
        /// Whatever the action returned.
        result: T,
        /// Whether the lock was actually held while running. `false` only
        /// for best-effort runs after a wait timeout with `run_anyway`.
        held_lock: bool,
    },
    /// The lock stayed busy past the wait timeout and the action was
    /// abandoned without running. Not an error; the caller tries again on
    /// its next cycle.
    Skipped,
}

impl<T> LockOutcome<T> {
    /// The action's result, if it ran.
    pub fn into_result(self) -> Option<T> {
        match self {
            Self::Completed { result, .. } => Some(result),
            Self::Skipped => None,
        }
    }
}

/// Runs closures under a per-key exclusive lock held in a shared expiring
/// store.
///
/// Oblivious to what it protects: it never inspects the action's result.
/// Acquisition retries on a fixed backoff until the wait timeout; the lease
/// TTL (`processing_timeout`) is a dead-man's-switch against crashed or
/// overrunning holders.
pub struct LockManager<S: LockStore> {
    store: S,
    retry_backoff: Duration,
}

impl<S: LockStore> LockManager<S> {
    /// Default pause between acquisition attempts.
    pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

    /// Create a manager over the given store with the default backoff.
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry_backoff: Self::DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Override the retry backoff (mainly for tests).
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Run `action` while exclusively holding `key`.
    ///
    /// Waits up to `wait_timeout` for the lock, retrying on a fixed
    /// backoff. On wait timeout: with `run_anyway` false the action is
    /// abandoned ([`LockOutcome::Skipped`]); with `run_anyway` true it runs
    /// without the lock; a rare double-run costs less than starving the
    /// action forever. A held lock is released on every exit path, and a
    /// warning is logged when the action outlived `processing_timeout`
    /// (the lease may have expired and been taken over meanwhile).
    pub async fn execute_in_lock<T>(
        &self,
        key: &str,
        wait_timeout: Duration,
        processing_timeout: Duration,
        run_anyway: bool,
        action: impl FnOnce() -> T,
    ) -> LockOutcome<T> {
        let wait_started = Instant::now();
        let mut retries = 0u32;
        let mut held_lock = true;

        while !self.store.try_acquire(key, processing_timeout) {
            if wait_started.elapsed() >= wait_timeout {
                tracing::debug!(
                    key,
                    waited_ms = wait_started.elapsed().as_millis() as u64,
                    retries,
                    run_anyway,
                    "lock wait timed out"
                );
                if run_anyway {
                    held_lock = false;
                    break;
                }
                return LockOutcome::Skipped;
            }
            retries += 1;
            tokio::time::sleep(self.retry_backoff).await;
        }

        tracing::debug!(
            key,
            wait_ms = wait_started.elapsed().as_millis() as u64,
            retries,
            held_lock,
            "executing in lock"
        );

        let run_started = Instant::now();
        let result = action();
        let elapsed = run_started.elapsed();
        if held_lock {
            self.store.release(key);
        }

        if elapsed > processing_timeout {
            tracing::warn!(
                key,
                elapsed_ms = elapsed.as_millis() as u64,
                timeout_ms = processing_timeout.as_millis() as u64,
                "action outlived its processing timeout; the lock may have expired mid-run"
            );
        }

        LockOutcome::Completed { result, held_lock }
    }
}
