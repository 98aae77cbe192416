//! Notifier construction errors.

use thiserror::Error;

/// Errors building a notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// No bot token configured.
    #[error("telegram bot token is not configured")]
    MissingToken,

    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
