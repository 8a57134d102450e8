//! Error types for scheduling operations

use thiserror::Error;

/// Errors that can occur while configuring the scheduler
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// A required timing parameter is missing or invalid. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),
}
