//! Error types for store operations

use thiserror::Error;

/// Errors that can occur in the reference store.
///
/// The in-memory backend cannot genuinely fail, but the variants keep its
/// surface honest against real backends (and let tests inject failures).
#[derive(Error, Debug)]
pub enum StoreError {
    /// A commit could not be applied.
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Backend-specific failure.
    #[error("Storage error: {0}")]
    Backend(String),
}
