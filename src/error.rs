use thiserror::Error;

/// Errors surfaced by every database operation in this crate.
///
/// Driver and pool errors are carried through unchanged; the remaining
/// variants describe lifecycle and configuration problems detected locally.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "native")]
    #[error(transparent)]
    PoolErrorNative(#[from] deadpool_postgres::PoolError),

    #[cfg(feature = "engine")]
    #[error(transparent)]
    PoolErrorEngine(#[from] bb8::RunError<tokio_postgres::Error>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Database not connected")]
    NotConnected,

    #[error("Database not initialized")]
    NotInitialized,
}

impl DbError {
    /// True for errors that are fixed by calling `connect()` first.
    #[must_use]
    pub fn is_not_connected(&self) -> bool {
        matches!(self, DbError::NotConnected)
    }

    /// The underlying driver error, if this error came from a statement.
    #[must_use]
    pub fn as_postgres(&self) -> Option<&tokio_postgres::Error> {
        match self {
            DbError::PostgresError(err) => Some(err),
            _ => None,
        }
    }
}
