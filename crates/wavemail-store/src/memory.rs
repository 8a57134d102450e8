//! In-memory wavelet store with staged/committed transaction semantics

use crate::error::StoreError;
use std::collections::HashMap;
use wavemail_domain::traits::WaveletStore;
use wavemail_domain::{ProvenanceRecord, Timestamp, WaveletId, WaveletState};

/// In-memory [`WaveletStore`] with per-unit commit/rollback.
///
/// `save` and `record_provenance` write to a staging area; `commit`
/// publishes it, `rollback` discards it. Loads read staged state first so a
/// processing unit observes its own writes.
///
/// # Examples
///
/// ```
/// use wavemail_domain::traits::WaveletStore;
/// use wavemail_domain::{WaveletId, WaveletState};
/// use wavemail_store::MemoryWaveletStore;
///
/// let mut store = MemoryWaveletStore::new();
/// let wavelet = WaveletState::new(WaveletId::new("wave", "conv"));
///
/// store.save(&wavelet).unwrap();
/// store.rollback().unwrap();
/// assert!(store.load(&wavelet.id).unwrap().is_none());
///
/// store.save(&wavelet).unwrap();
/// store.commit().unwrap();
/// assert!(store.load(&wavelet.id).unwrap().is_some());
/// ```
#[derive(Default)]
pub struct MemoryWaveletStore {
    committed: HashMap<String, WaveletState>,
    staged: HashMap<String, WaveletState>,
    provenance: Vec<ProvenanceRecord>,
    staged_provenance: Vec<ProvenanceRecord>,
    fail_next_commit: bool,
}

impl MemoryWaveletStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All committed provenance records, oldest first.
    pub fn provenance(&self) -> &[ProvenanceRecord] {
        &self.provenance
    }

    /// Make the next `commit` fail, for exercising persistence-failure
    /// paths in tests.
    pub fn induce_commit_failure(&mut self) {
        self.fail_next_commit = true;
    }
}

impl WaveletStore for MemoryWaveletStore {
    type Error = StoreError;

    fn load(&self, id: &WaveletId) -> Result<Option<WaveletState>, Self::Error> {
        let key = id.storage_key();
        Ok(self
            .staged
            .get(&key)
            .or_else(|| self.committed.get(&key))
            .cloned())
    }

    fn save(&mut self, state: &WaveletState) -> Result<(), Self::Error> {
        self.staged.insert(state.id.storage_key(), state.clone());
        Ok(())
    }

    fn due_wavelets(&self, now: Timestamp) -> Result<Vec<WaveletId>, Self::Error> {
        let mut due: Vec<(Timestamp, WaveletId)> = self
            .committed
            .iter()
            .map(|(key, state)| (key, state))
            .filter(|(key, _)| !self.staged.contains_key(*key))
            .chain(self.staged.iter().map(|(key, state)| (key, state)))
            .filter(|(_, state)| state.time_for_sending <= now)
            .map(|(_, state)| (state.time_for_sending, state.id.clone()))
            .collect();
        due.sort();
        Ok(due.into_iter().map(|(_, id)| id).collect())
    }

    fn record_provenance(&mut self, record: ProvenanceRecord) -> Result<(), Self::Error> {
        self.staged_provenance.push(record);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        if self.fail_next_commit {
            self.fail_next_commit = false;
            self.staged.clear();
            self.staged_provenance.clear();
            return Err(StoreError::Commit("induced failure".into()));
        }
        self.committed.extend(self.staged.drain());
        self.provenance.append(&mut self.staged_provenance);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.staged.clear();
        self.staged_provenance.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavemail_domain::TIME_INFINITY;

    fn wavelet(key: &str, time_for_sending: Timestamp) -> WaveletState {
        let mut w = WaveletState::new(WaveletId::new("wave", key));
        w.time_for_sending = time_for_sending;
        w
    }

    #[test]
    fn test_load_missing_is_none() {
        let store = MemoryWaveletStore::new();
        assert!(store.load(&WaveletId::new("w", "c")).unwrap().is_none());
    }

    #[test]
    fn test_staged_save_visible_to_own_load() {
        let mut store = MemoryWaveletStore::new();
        let w = wavelet("c", 100);
        store.save(&w).unwrap();
        assert_eq!(store.load(&w.id).unwrap().unwrap().time_for_sending, 100);
    }

    #[test]
    fn test_rollback_discards_staged_state() {
        let mut store = MemoryWaveletStore::new();
        let w = wavelet("c", 100);
        store.save(&w).unwrap();
        store.commit().unwrap();

        let mut updated = w.clone();
        updated.time_for_sending = 999;
        store.save(&updated).unwrap();
        store
            .record_provenance(ProvenanceRecord {
                message_id: "m".into(),
                wavelet: w.id.clone(),
                recipients: vec![],
                sent_at: 1,
            })
            .unwrap();
        store.rollback().unwrap();

        assert_eq!(store.load(&w.id).unwrap().unwrap().time_for_sending, 100);
        assert!(store.provenance().is_empty());
    }

    #[test]
    fn test_commit_publishes_provenance() {
        let mut store = MemoryWaveletStore::new();
        store
            .record_provenance(ProvenanceRecord {
                message_id: "m".into(),
                wavelet: WaveletId::new("w", "c"),
                recipients: vec![],
                sent_at: 1,
            })
            .unwrap();
        store.commit().unwrap();
        assert_eq!(store.provenance().len(), 1);
    }

    #[test]
    fn test_due_wavelets_ordered_by_time() {
        let mut store = MemoryWaveletStore::new();
        store.save(&wavelet("late", 300)).unwrap();
        store.save(&wavelet("early", 100)).unwrap();
        store.save(&wavelet("idle", TIME_INFINITY)).unwrap();
        store.save(&wavelet("future", 10_000)).unwrap();
        store.commit().unwrap();

        let due = store.due_wavelets(500).unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].wavelet_id, "early");
        assert_eq!(due[1].wavelet_id, "late");
    }

    #[test]
    fn test_due_wavelets_sees_staged_updates() {
        let mut store = MemoryWaveletStore::new();
        store.save(&wavelet("c", 100)).unwrap();
        store.commit().unwrap();

        // Staged update pushes the wavelet past `now`.
        store.save(&wavelet("c", 9_999)).unwrap();
        assert!(store.due_wavelets(500).unwrap().is_empty());
    }

    #[test]
    fn test_induced_commit_failure() {
        let mut store = MemoryWaveletStore::new();
        store.save(&wavelet("c", 100)).unwrap();
        store.induce_commit_failure();
        assert!(store.commit().is_err());
        // Nothing was published, and the failure is not sticky.
        assert!(store.load(&WaveletId::new("wave", "c")).unwrap().is_none());
        store.save(&wavelet("c", 100)).unwrap();
        assert!(store.commit().is_ok());
    }
}
