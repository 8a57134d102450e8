//! Configuration for the sendability calculator
//!
//! All timing parameters are in seconds; internal arithmetic is in
//! milliseconds.

use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing policy for the sendability calculator
///
/// # Examples
///
/// ```
/// use wavemail_scheduler::SchedulerConfig;
///
/// // Default policy (one minute submit lag, five minute quiet period)
/// let config = SchedulerConfig::default();
/// assert_eq!(config.submit_lag_secs, 60);
///
/// // Faster turnaround for small teams
/// let config = SchedulerConfig::rapid();
/// assert_eq!(config.submit_lag_secs, 15);
///
/// // Fewer, larger digests
/// let config = SchedulerConfig::relaxed();
/// assert_eq!(config.min_send_interval_secs, 1800);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minimum wait after a submit before the edit is sendable (seconds).
    /// Default: 60
    pub submit_lag_secs: u64,

    /// Minimum quiet period after the last change while someone is still
    /// editing (seconds). Default: 300
    pub no_edit_lag_secs: u64,

    /// Hard cap on how long an edit can stay unsent after its first edit,
    /// however much it keeps changing (seconds). Default: 3600
    pub max_edit_lifetime_secs: u64,

    /// Floor on the time between two digest sends for the same wavelet
    /// (seconds). Default: 600
    pub min_send_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            submit_lag_secs: 60,
            no_edit_lag_secs: 300,
            max_edit_lifetime_secs: 3600,
            min_send_interval_secs: 600,
        }
    }
}

impl SchedulerConfig {
    /// Short lags and a low interval floor: digests go out quickly.
    pub fn rapid() -> Self {
        Self {
            submit_lag_secs: 15,
            no_edit_lag_secs: 60,
            max_edit_lifetime_secs: 900,
            min_send_interval_secs: 120,
        }
    }

    /// Long lags and a high interval floor: fewer, larger digests.
    pub fn relaxed() -> Self {
        Self {
            submit_lag_secs: 300,
            no_edit_lag_secs: 900,
            max_edit_lifetime_secs: 14400,
            min_send_interval_secs: 1800,
        }
    }

    /// Check that every timing parameter is usable. A zero value would
    /// either disable a rule silently or make every edit instantly
    /// sendable, so all four must be positive.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        for (name, value) in [
            ("submit_lag_secs", self.submit_lag_secs),
            ("no_edit_lag_secs", self.no_edit_lag_secs),
            ("max_edit_lifetime_secs", self.max_edit_lifetime_secs),
            ("min_send_interval_secs", self.min_send_interval_secs),
        ] {
            if value == 0 {
                return Err(SchedulerError::Config(format!(
                    "{name} must be positive (got 0)"
                )));
            }
        }
        Ok(())
    }

    /// Submit lag as a Duration
    pub fn submit_lag(&self) -> Duration {
        Duration::from_secs(self.submit_lag_secs)
    }

    /// Quiet period as a Duration
    pub fn no_edit_lag(&self) -> Duration {
        Duration::from_secs(self.no_edit_lag_secs)
    }

    /// Lifetime cap as a Duration
    pub fn max_edit_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_edit_lifetime_secs)
    }

    /// Send-interval floor as a Duration
    pub fn min_send_interval(&self) -> Duration {
        Duration::from_secs(self.min_send_interval_secs)
    }

    pub(crate) fn submit_lag_ms(&self) -> u64 {
        self.submit_lag_secs * 1000
    }

    pub(crate) fn no_edit_lag_ms(&self) -> u64 {
        self.no_edit_lag_secs * 1000
    }

    pub(crate) fn max_edit_lifetime_ms(&self) -> u64 {
        self.max_edit_lifetime_secs * 1000
    }

    pub(crate) fn min_send_interval_ms(&self) -> u64 {
        self.min_send_interval_secs * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.submit_lag_secs, 60);
        assert_eq!(config.no_edit_lag_secs, 300);
        assert_eq!(config.max_edit_lifetime_secs, 3600);
        assert_eq!(config.min_send_interval_secs, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(SchedulerConfig::rapid().validate().is_ok());
        assert!(SchedulerConfig::relaxed().validate().is_ok());
    }

    #[test]
    fn test_zero_parameter_rejected() {
        let config = SchedulerConfig {
            no_edit_lag_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no_edit_lag_secs"));
    }

    #[test]
    fn test_duration_conversions() {
        let config = SchedulerConfig::default();
        assert_eq!(config.submit_lag(), Duration::from_secs(60));
        assert_eq!(config.no_edit_lag(), Duration::from_secs(300));
        assert_eq!(config.max_edit_lifetime(), Duration::from_secs(3600));
        assert_eq!(config.min_send_interval(), Duration::from_secs(600));
    }

    #[test]
    fn test_loads_from_toml() {
        let config: SchedulerConfig = toml::from_str(
            r#"
            submit_lag_secs = 30
            no_edit_lag_secs = 120
            max_edit_lifetime_secs = 7200
            min_send_interval_secs = 300
            "#,
        )
        .unwrap();
        assert_eq!(config.submit_lag_secs, 30);
        assert_eq!(config.max_edit_lifetime_secs, 7200);
        assert!(config.validate().is_ok());
    }
}
