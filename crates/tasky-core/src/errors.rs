//! Error types shared across collaborator boundaries.
//!
//! Each backend crate keeps its own detailed error enum and converts into
//! [`CoreError`] at the trait boundary, so the scheduler only has to reason
//! about a small, stable set of failure kinds.

use thiserror::Error;

/// Errors surfaced by collaborators of the scheduling core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The storage backend failed (query, pool, serialization).
    #[error("storage error: {0}")]
    Storage(String),

    /// Creating a task through the task-creation collaborator failed.
    #[error("task creation failed: {0}")]
    TaskCreation(String),

    /// A record referenced by ID does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A value could not be parsed (time of day, date, enum).
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Convenience result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
