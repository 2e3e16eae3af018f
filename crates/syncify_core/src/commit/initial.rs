//! The root commit of every history.

use crate::hash::CommitHash;
use crate::snapshot::State;
use serde_json::json;

/// Holds the full starting state. Has no parents; exactly one may exist
/// per workspace.
#[derive(Debug, Clone)]
pub struct InitialCommit<S> {
    hash: CommitHash,
    state: S,
}

impl<S: State> InitialCommit<S> {
    /// Creates an initial commit for `state`.
    pub fn new(state: S) -> Self {
        let hash = CommitHash::of_value(&json!({ "state": state.snapshot().to_value() }));
        Self { hash, state }
    }
}

impl<S> InitialCommit<S> {
    /// Returns the commit hash.
    pub fn hash(&self) -> &CommitHash {
        &self.hash
    }

    /// Returns the seeded state.
    pub fn state(&self) -> &S {
        &self.state
    }
}
