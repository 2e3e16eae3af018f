//! Serialized commit shape and restoration.

use super::{CommandCommit, Commit, CommitKind, InitialCommit, MergeCommit, RevertCommit};
use crate::error::{CoreError, CoreResult};
use crate::hash::CommitHash;
use crate::snapshot::{Restorer, Snapshot, State};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The persisted and transmitted form of a commit.
///
/// ```json
/// { "type": "Command", "hash": "…", "parents": ["…"], "command": { "type": "…" } }
/// ```
///
/// Variant fields: `state` (Initial), `command` (Command),
/// `target`/`source`/`selection` (Merge), `target` (Revert).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSnapshot {
    /// Variant tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Content hash recorded when the snapshot was taken.
    pub hash: CommitHash,
    /// Direct predecessors.
    pub parents: Vec<CommitHash>,
    /// Variant-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CommitSnapshot {
    fn field<T: DeserializeOwned>(&self, name: &str) -> CoreResult<T> {
        let value = self.fields.get(name).ok_or_else(|| {
            CoreError::malformed_snapshot(format!("{} commit is missing \"{name}\"", self.kind))
        })?;
        serde_json::from_value(value.clone()).map_err(|e| {
            CoreError::malformed_snapshot(format!("{} commit field \"{name}\": {e}", self.kind))
        })
    }

    fn single_parent(&self) -> CoreResult<CommitHash> {
        match self.parents.as_slice() {
            [parent] => Ok(parent.clone()),
            _ => Err(CoreError::malformed_snapshot(format!(
                "{} commit must have exactly one parent, found {}",
                self.kind,
                self.parents.len()
            ))),
        }
    }
}

impl<S: State> Commit<S> {
    /// Returns the canonical snapshot of this commit.
    pub fn snapshot(&self) -> CommitSnapshot {
        let mut fields = Map::new();
        match self {
            Commit::Initial(c) => {
                fields.insert("state".into(), c.state().snapshot().to_value());
            }
            Commit::Command(c) => {
                fields.insert("command".into(), c.command().snapshot().to_value());
            }
            Commit::Merge(c) => {
                fields.insert("target".into(), Value::String(c.target().to_string()));
                fields.insert("source".into(), Value::String(c.source().to_string()));
                fields.insert("selection".into(), Value::String(c.selection().to_string()));
            }
            Commit::Revert(c) => {
                fields.insert("target".into(), Value::String(c.target().to_string()));
            }
        }

        CommitSnapshot {
            kind: self.kind().as_str().to_string(),
            hash: self.hash().clone(),
            parents: self.parents().cloned().collect(),
            fields,
        }
    }
}

/// Rebuilds a commit from its snapshot.
///
/// Dispatches on the `type` tag and uses `restorer` for embedded state and
/// command snapshots. The hash is recomputed from the restored content and
/// must match the recorded one.
///
/// # Errors
///
/// - [`CoreError::UnknownCommitType`] for an unrecognized tag
/// - [`CoreError::MalformedSnapshot`] for missing fields or a wrong parent count
/// - [`CoreError::HashMismatch`] if the content does not hash to `snapshot.hash`
/// - any error returned by `restorer`
pub fn restore_commit<S: State>(
    snapshot: &CommitSnapshot,
    restorer: &dyn Restorer<S>,
) -> CoreResult<Commit<S>> {
    let kind = CommitKind::from_tag(&snapshot.kind).ok_or_else(|| CoreError::UnknownCommitType {
        kind: snapshot.kind.clone(),
    })?;

    let commit: Commit<S> = match kind {
        CommitKind::Initial => {
            if !snapshot.parents.is_empty() {
                return Err(CoreError::malformed_snapshot(
                    "Initial commit must not have parents",
                ));
            }
            let state: Snapshot = snapshot.field("state")?;
            InitialCommit::new(restorer.restore_state(&state)?).into()
        }
        CommitKind::Command => {
            let parent = snapshot.single_parent()?;
            let command: Snapshot = snapshot.field("command")?;
            CommandCommit::new(parent, restorer.restore_command(&command)?).into()
        }
        CommitKind::Merge => MergeCommit::new(
            snapshot.field("target")?,
            snapshot.field("source")?,
            snapshot.field("selection")?,
        )?
        .into(),
        CommitKind::Revert => {
            RevertCommit::new(snapshot.single_parent()?, snapshot.field("target")?).into()
        }
    };

    if commit.hash() != &snapshot.hash {
        return Err(CoreError::HashMismatch {
            expected: snapshot.hash.clone(),
            actual: commit.hash().clone(),
        });
    }

    Ok(commit)
}
