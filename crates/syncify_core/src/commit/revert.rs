//! Commits that undo (or redo) another commit.

use crate::hash::CommitHash;
use serde_json::json;

/// Reverts `target`, which lives elsewhere in the history.
///
/// Reverting a revert re-applies the original change, which is how redo is
/// expressed in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertCommit {
    hash: CommitHash,
    parent: CommitHash,
    target: CommitHash,
}

impl RevertCommit {
    /// Creates a revert commit on top of `parent`.
    pub fn new(parent: CommitHash, target: CommitHash) -> Self {
        let hash = CommitHash::of_value(&json!({
            "parent": parent.as_str(),
            "target": target.as_str(),
        }));
        Self {
            hash,
            parent,
            target,
        }
    }

    /// Returns the commit hash.
    pub fn hash(&self) -> &CommitHash {
        &self.hash
    }

    /// Returns the parent hash.
    pub fn parent(&self) -> &CommitHash {
        &self.parent
    }

    /// Returns the reverted commit.
    pub fn target(&self) -> &CommitHash {
        &self.target
    }
}
