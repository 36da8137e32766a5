//! Error types for the pending-registration store and the durable user repository.

use thiserror::Error;

/// Result alias for pending-registration store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result alias for durable user repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors raised by a pending-registration store backend.
///
/// None of these are retried by the registration path; they surface to the
/// caller as a generic failure and are logged with detail.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the command.
    #[error("Store connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<redis::RedisError>,
    },

    /// A staged value could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A live entry already exists under a freshly generated token.
    #[error("Pending registration already exists for token {token}")]
    Collision { token: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Connection {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Errors raised by the durable user repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A user with the same username or email already exists.
    #[error("A user with this username or email already exists")]
    Conflict,

    #[error("User repository I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("User repository serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("User repository task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}
