use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

/// Every failure surfaced by this crate.
///
/// Driver errors are carried transparently so callers can tell a bad statement from a missing
/// sequence from a refused connection without unpacking strings.
#[derive(Debug, Error)]
pub enum SessionDbError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Usage error: {0}")]
    UsageError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl SessionDbError {
    /// True for failures raised by this crate because the caller misused the API.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::UsageError(_))
    }
}
