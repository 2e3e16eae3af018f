//! Error types for Syncify core.

use crate::branches::BranchKind;
use crate::hash::CommitHash;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the commit graph and workspace operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A second initial commit was added to a non-empty workspace.
    #[error("cannot add dangling initial commit {hash}: workspace already has commits")]
    DanglingInitialCommit {
        /// Hash of the rejected commit.
        hash: CommitHash,
    },

    /// A commit references a parent that is not in the workspace.
    #[error("commit {commit} references missing parent {parent}")]
    MissingParentCommit {
        /// Hash of the rejected commit.
        commit: CommitHash,
        /// The parent hash that could not be found.
        parent: CommitHash,
    },

    /// A commit with the same hash is already present.
    #[error("commit {hash} is already in the workspace")]
    DuplicateCommit {
        /// Hash of the duplicate commit.
        hash: CommitHash,
    },

    /// A branch head points at a commit that is not in the workspace.
    #[error("{kind} branch \"{name}\" points at missing commit {head}")]
    DanglingBranchHead {
        /// Kind of the offending branch.
        kind: BranchKind,
        /// Name of the offending branch.
        name: String,
        /// The missing head hash.
        head: CommitHash,
    },

    /// A merge selects neither of its parents.
    #[error("merge selection {selection} is neither target {target} nor source {merged}")]
    InvalidMergeSelection {
        /// The branch being merged onto.
        target: CommitHash,
        /// The branch being merged in.
        merged: CommitHash,
        /// The invalid selection.
        selection: CommitHash,
    },

    /// A merge uses the same commit as target and source.
    #[error("cannot merge commit {hash} into itself")]
    SelfMerge {
        /// The commit used on both sides.
        hash: CommitHash,
    },

    /// A restored commit does not hash to its recorded hash.
    #[error("hash mismatch: snapshot says {expected}, content hashes to {actual}")]
    HashMismatch {
        /// Hash recorded in the snapshot.
        expected: CommitHash,
        /// Hash computed from the restored content.
        actual: CommitHash,
    },

    /// No commit with the given hash exists.
    #[error("commit not found: {hash}")]
    CommitNotFound {
        /// The hash that was looked up.
        hash: CommitHash,
    },

    /// No branch of the given kind and name exists.
    #[error("{kind} branch not found: {name}")]
    BranchNotFound {
        /// Kind of branch that was looked up.
        kind: BranchKind,
        /// Name of the branch.
        name: String,
    },

    /// The workspace has no initial commit.
    #[error("workspace has no initial commit")]
    NoInitialCommit,

    /// A commit snapshot carries an unknown type tag.
    #[error("unknown commit type: {kind}")]
    UnknownCommitType {
        /// The unrecognized tag.
        kind: String,
    },

    /// A state or command snapshot carries a tag the restorer does not handle.
    #[error("unsupported snapshot type: {kind}")]
    UnsupportedType {
        /// The unrecognized tag.
        kind: String,
    },

    /// A snapshot is missing fields or has fields of the wrong shape.
    #[error("malformed snapshot: {message}")]
    MalformedSnapshot {
        /// Description of the problem.
        message: String,
    },

    /// The initial commit has no previous state.
    #[error("cannot revert initial commit {hash}")]
    CannotRevertInitial {
        /// Hash of the initial commit.
        hash: CommitHash,
    },

    /// There is nothing left to undo on the branch.
    #[error("no commits to undo on branch \"{branch}\"")]
    NoCommitsToUndo {
        /// The branch that was inspected.
        branch: String,
    },

    /// There is nothing left to redo on the branch.
    #[error("no commits to redo on branch \"{branch}\"")]
    NoCommitsToRedo {
        /// The branch that was inspected.
        branch: String,
    },
}

impl CoreError {
    /// Creates a malformed snapshot error.
    pub fn malformed_snapshot(message: impl Into<String>) -> Self {
        Self::MalformedSnapshot {
            message: message.into(),
        }
    }

    /// Creates an unsupported type error.
    pub fn unsupported_type(kind: impl Into<String>) -> Self {
        Self::UnsupportedType { kind: kind.into() }
    }

    /// Returns true for errors that indicate a programming error or
    /// corrupted storage. These are never retried.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            CoreError::DanglingInitialCommit { .. }
                | CoreError::MissingParentCommit { .. }
                | CoreError::DuplicateCommit { .. }
                | CoreError::DanglingBranchHead { .. }
                | CoreError::InvalidMergeSelection { .. }
                | CoreError::SelfMerge { .. }
                | CoreError::HashMismatch { .. }
        )
    }

    /// Returns true for not-found style errors a caller is expected to handle,
    /// e.g. by disabling an undo button.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownCommitType { .. }
                | CoreError::UnsupportedType { .. }
                | CoreError::NoCommitsToUndo { .. }
                | CoreError::NoCommitsToRedo { .. }
                | CoreError::CommitNotFound { .. }
                | CoreError::BranchNotFound { .. }
        )
    }
}
