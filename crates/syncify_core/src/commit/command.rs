//! Commits that record a user command.

use crate::hash::CommitHash;
use crate::snapshot::{CommandRef, State};
use serde_json::json;

/// Applies one [`Command`](crate::Command) on top of its parent's state.
#[derive(Debug, Clone)]
pub struct CommandCommit<S> {
    hash: CommitHash,
    parent: CommitHash,
    command: CommandRef<S>,
}

impl<S: State> CommandCommit<S> {
    /// Creates a command commit on top of `parent`.
    pub fn new(parent: CommitHash, command: CommandRef<S>) -> Self {
        let hash = CommitHash::of_value(&json!({
            "parent": parent.as_str(),
            "command": command.snapshot().to_value(),
        }));
        Self {
            hash,
            parent,
            command,
        }
    }
}

impl<S> CommandCommit<S> {
    /// Returns the commit hash.
    pub fn hash(&self) -> &CommitHash {
        &self.hash
    }

    /// Returns the parent hash.
    pub fn parent(&self) -> &CommitHash {
        &self.parent
    }

    /// Returns the recorded command.
    pub fn command(&self) -> &CommandRef<S> {
        &self.command
    }
}
