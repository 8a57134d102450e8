//! Metrics collection for digest batch runs

/// Counters accumulated across digest batch invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestMetrics {
    /// Batch invocations completed.
    pub runs: usize,

    /// Wavelets fully processed (digests sent and state advanced).
    pub wavelets_sent: usize,

    /// Wavelets skipped because re-validation found them not due.
    pub skipped_not_due: usize,

    /// Wavelets skipped because their lock stayed busy.
    pub skipped_lock_busy: usize,

    /// Wavelets left for the next trigger because the batch deadline hit.
    pub deferred_by_deadline: usize,

    /// Digest emails sent (one per recipient per wavelet pass).
    pub digests_sent: usize,

    /// Pending edits consumed by successful sends.
    pub edits_sent: usize,

    /// Per-wavelet processing failures (delivery or invariant).
    pub failures: usize,
}

impl DigestMetrics {
    /// Create empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Human-readable summary report.
    pub fn summary(&self) -> String {
        format!(
            "Digest Metrics Summary\n\
             ======================\n\
             Runs: {}\n\
             Wavelets sent: {}\n\
             Digests sent: {}\n\
             Edits consumed: {}\n\
             Skipped (not due): {}\n\
             Skipped (lock busy): {}\n\
             Deferred (deadline): {}\n\
             Failures: {}",
            self.runs,
            self.wavelets_sent,
            self.digests_sent,
            self.edits_sent,
            self.skipped_not_due,
            self.skipped_lock_busy,
            self.deferred_by_deadline,
            self.failures,
        )
    }
}
