//! Configuration for the digest batch job

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Invalid digest-job configuration. Fatal at startup.
#[derive(Error, Debug)]
#[error("Configuration error: {0}")]
pub struct DigestConfigError(pub String);

/// Operational knobs for the digest runner and worker.
///
/// # Examples
///
/// ```
/// use wavemail_digest::DigestConfig;
///
/// let config = DigestConfig::default();
/// assert_eq!(config.lock_wait_ms, 1000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// How long to wait for a wavelet's lock before giving up (ms).
    /// Default: 1000
    pub lock_wait_ms: u64,

    /// Lease TTL on a held wavelet lock; also the expected upper bound on
    /// one wavelet's processing time (ms). Default: 10000
    pub lock_ttl_ms: u64,

    /// Run a wavelet without its lock after the wait times out, instead of
    /// deferring to the next cycle. Default: false
    #[serde(default)]
    pub run_anyway: bool,

    /// Wall-clock budget for one batch invocation (seconds); wavelets left
    /// over are picked up by the next trigger. Default: 10
    pub max_batch_secs: u64,

    /// Interval between periodic triggers in the background worker
    /// (seconds). Default: 60
    pub trigger_interval_secs: u64,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            lock_wait_ms: 1000,
            lock_ttl_ms: 10_000,
            run_anyway: false,
            max_batch_secs: 10,
            trigger_interval_secs: 60,
        }
    }
}

impl DigestConfig {
    /// Check the timing parameters. `lock_wait_ms` may be zero (try the
    /// lock once and defer), the rest must be positive.
    pub fn validate(&self) -> Result<(), DigestConfigError> {
        for (name, value) in [
            ("lock_ttl_ms", self.lock_ttl_ms),
            ("max_batch_secs", self.max_batch_secs),
            ("trigger_interval_secs", self.trigger_interval_secs),
        ] {
            if value == 0 {
                return Err(DigestConfigError(format!(
                    "{name} must be positive (got 0)"
                )));
            }
        }
        Ok(())
    }

    /// Lock wait timeout as a Duration
    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    /// Lock lease TTL as a Duration
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    /// Batch budget as a Duration
    pub fn max_batch(&self) -> Duration {
        Duration::from_secs(self.max_batch_secs)
    }

    /// Worker trigger interval as a Duration
    pub fn trigger_interval(&self) -> Duration {
        Duration::from_secs(self.trigger_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let config = DigestConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.run_anyway);
        assert_eq!(config.max_batch(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_wait_is_allowed() {
        let config = DigestConfig {
            lock_wait_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = DigestConfig {
            lock_ttl_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("lock_ttl_ms"));
    }
}
