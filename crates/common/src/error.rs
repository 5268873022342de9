//! Common error types for duocall components.

use thiserror::Error;

/// Errors returned by a [`Repository`](crate::repository::Repository) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No record is stored under the requested key
    #[error("Not found: {0}")]
    NotFound(String),

    /// The storage backend failed
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type alias using `RepositoryError`
pub type Result<T> = std::result::Result<T, RepositoryError>;
