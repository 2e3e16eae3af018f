//! Error types for the sync engine.

use syncify_core::{CommitHash, CoreError};
use syncify_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The workspace has no local ref for the branch being synchronized.
    #[error("missing local branch \"{branch}\"")]
    MissingLocalBranch {
        /// Branch name.
        branch: String,
    },

    /// A push would discard commits the remote already has.
    #[error("cannot push {new_head} to \"{branch}\": remote head {remote_head} is not an ancestor")]
    NonFastForwardPush {
        /// Branch name.
        branch: String,
        /// The remote's current head.
        remote_head: CommitHash,
        /// The rejected head.
        new_head: CommitHash,
    },

    /// Neither a local nor a remote ref exists for the branch.
    #[error("branch \"{branch}\" is missing locally and remotely")]
    BranchMissing {
        /// Branch name.
        branch: String,
    },

    /// The synchronizer reached a state its classification rules out.
    #[error("impossible sync state on \"{branch}\": {reason}")]
    ImpossibleSyncState {
        /// Branch name.
        branch: String,
        /// What was violated.
        reason: String,
    },

    /// Edits are refused until the pending conflict is resolved.
    #[error("branch \"{branch}\" has an unresolved conflict")]
    UnresolvedConflict {
        /// Branch name.
        branch: String,
    },

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// An attempt exceeded the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// Configuration is out of bounds.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Commit graph error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage error on a storage-backed remote.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    pub(crate) fn impossible(branch: &str, reason: impl Into<String>) -> Self {
        Self::ImpossibleSyncState {
            branch: branch.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout => true,
            _ => false,
        }
    }

    /// Returns true for protocol failures the caller may recover from by
    /// synchronizing again.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            SyncError::MissingLocalBranch { .. }
                | SyncError::NonFastForwardPush { .. }
                | SyncError::BranchMissing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(!SyncError::BranchMissing { branch: "main".into() }.is_retryable());
        assert!(!SyncError::Core(CoreError::NoInitialCommit).is_retryable());
    }

    #[test]
    fn protocol_errors() {
        let err = SyncError::NonFastForwardPush {
            branch: "main".into(),
            remote_head: CommitHash::from_hex("aaaa"),
            new_head: CommitHash::from_hex("bbbb"),
        };
        assert!(err.is_protocol());
        assert!(!SyncError::Timeout.is_protocol());
    }

    #[test]
    fn error_display() {
        let err = SyncError::MissingLocalBranch { branch: "main".into() };
        assert_eq!(err.to_string(), "missing local branch \"main\"");

        let err = SyncError::impossible("main", "remote not ahead");
        assert!(err.to_string().contains("remote not ahead"));
    }
}
