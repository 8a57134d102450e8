//! Timestamp conventions shared across the workspace

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Sentinel for "this timestamp has never been set".
pub const TIME_UNSET: Timestamp = 0;

/// Logical infinity: nothing is scheduled.
pub const TIME_INFINITY: Timestamp = u64::MAX;

/// Sentinel returned by the sendability calculator for an edit that may be
/// emailed right away (a manual send request with no edit since). Any real
/// wall-clock value compares greater than this.
pub const IMMEDIATELY_SENDABLE: Timestamp = 1;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Timestamp
}
