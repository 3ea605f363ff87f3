//! Error types for the sync engine.

use tablesync_core::LocalId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by the local store gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A query against the store failed.
    #[error("store query failed: {0}")]
    QueryFailed(String),

    /// Persisting an entity failed.
    #[error("store save failed: {0}")]
    SaveFailed(String),

    /// Removing an entity failed.
    #[error("store delete failed: {0}")]
    DeleteFailed(String),

    /// The entity is not present in the store.
    #[error("entity {0} not found")]
    NotFound(LocalId),
}

/// Errors raised by the remote table gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network failure before a server response was received.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
        /// Whether a later pass may succeed.
        retryable: bool,
    },

    /// The server rejected the operation.
    #[error("server rejected operation: {0}")]
    Rejected(String),

    /// The record lacks the identity key the operation requires.
    #[error("record has no remote identity")]
    MissingIdentity,

    /// The server response could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl RemoteError {
    /// Creates a retryable network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: true,
        }
    }

    /// Returns true if a later push of the same entity may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network { retryable, .. } => *retryable,
            RemoteError::Rejected(_) => true,
            _ => false,
        }
    }
}

/// Errors surfaced by the engine.
///
/// `Discovery` aborts a whole pass before any remote call; the other
/// variants are per-entity and travel through the observer without
/// affecting the rest of the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Dirty-entity discovery failed; the pass was aborted.
    #[error("dirty entity discovery failed: {0}")]
    Discovery(#[source] StoreError),

    /// A local store operation failed for one entity.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A remote table operation failed for one entity.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
