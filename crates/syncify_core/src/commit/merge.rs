//! Commits that join two histories.

use crate::error::{CoreError, CoreResult};
use crate::hash::CommitHash;
use serde_json::json;

/// Joins `target` (the branch merged onto) and `source` (the branch merged
/// in), keeping the state of `selection`.
///
/// # Invariants
///
/// - `target != source`
/// - `selection` is either `target` or `source`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCommit {
    hash: CommitHash,
    target: CommitHash,
    source: CommitHash,
    selection: CommitHash,
}

impl MergeCommit {
    /// Creates a merge commit, validating the selection.
    pub fn new(target: CommitHash, source: CommitHash, selection: CommitHash) -> CoreResult<Self> {
        if target == source {
            return Err(CoreError::SelfMerge { hash: target });
        }

        if selection != target && selection != source {
            return Err(CoreError::InvalidMergeSelection {
                target,
                merged: source,
                selection,
            });
        }

        let hash = CommitHash::of_value(&json!({
            "target": target.as_str(),
            "source": source.as_str(),
            "selection": selection.as_str(),
        }));

        Ok(Self {
            hash,
            target,
            source,
            selection,
        })
    }

    /// Returns the commit hash.
    pub fn hash(&self) -> &CommitHash {
        &self.hash
    }

    /// Returns the commit merged onto.
    pub fn target(&self) -> &CommitHash {
        &self.target
    }

    /// Returns the commit merged in.
    pub fn source(&self) -> &CommitHash {
        &self.source
    }

    /// Returns the parent whose state survives the merge.
    pub fn selection(&self) -> &CommitHash {
        &self.selection
    }

    /// Returns true if the merge keeps the target's state.
    pub fn selects_target(&self) -> bool {
        self.selection == self.target
    }
}
