//! Error types for storage operations.

use crate::id::ItemId;
use syncify_core::CoreError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An item with the same id is already stored.
    #[error("repository already contains item with id {id}")]
    AlreadyExists {
        /// The conflicting id.
        id: ItemId,
    },

    /// No item with the id is stored.
    #[error("no item with id {id} in repository")]
    NotFound {
        /// The missing id.
        id: ItemId,
    },

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored commit or branch violates a graph invariant.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
