//! Expiring-key stores backing the lock manager

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A shared key/value store with atomic add-if-absent and per-key expiry,
/// the memcache-style contract the lock manager runs on.
///
/// Implementations must be safe to share across workers (`&self` methods,
/// interior synchronization).
pub trait LockStore {
    /// Atomically create `key` with the given time-to-live. Returns `true`
    /// if the key was absent (or expired) and is now held by the caller,
    /// `false` if someone else holds it.
    fn try_acquire(&self, key: &str, ttl: Duration) -> bool;

    /// Delete `key`, releasing the lock. Releasing an already-expired key
    /// is a no-op.
    fn release(&self, key: &str);
}

/// In-process implementation of [`LockStore`].
///
/// Clones share one underlying map, so a cloned store hands out the same
/// locks. The in-process stand-in for a shared external store.
#[derive(Clone, Default)]
pub struct MemoryLockStore {
    entries: Arc<Mutex<HashMap<String, Instant>>>,
}

impl MemoryLockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockStore for MemoryLockStore {
    fn try_acquire(&self, key: &str, ttl: Duration) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match entries.get(key) {
            Some(expiry) if *expiry > now => false,
            _ => {
                entries.insert(key.to_string(), now + ttl);
                true
            }
        }
    }

    fn release(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}
