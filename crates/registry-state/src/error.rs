//! Error types for registry-state

use thiserror::Error;

/// Errors reported by registry collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Requested record does not exist
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Backend (database, registry API) failure
    #[error("backend failure: {0}")]
    Backend(String),

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,
}
