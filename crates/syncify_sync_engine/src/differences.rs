//! Local versus remote-tracking divergence of one branch.

use crate::error::{SyncError, SyncResult};
use std::collections::HashSet;
use syncify_core::{ancestry, BranchKind, CommitHash, Workspace};

/// How the two refs of a branch relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    /// Same ancestry on both sides.
    Equal,
    /// Local has commits the remote lacks, and nothing the other way.
    LocalAhead,
    /// Remote has commits local lacks, and nothing the other way.
    RemoteAhead,
    /// Both sides have commits the other lacks.
    Diverged,
}

/// Commits reachable from one ref of a branch but not the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Differences {
    /// Reachable from the local head only.
    pub local: HashSet<CommitHash>,
    /// Reachable from the remote-tracking head only.
    pub remote: HashSet<CommitHash>,
}

impl Differences {
    /// Compares the ancestry of the local and remote-tracking refs of
    /// `branch`. A missing ref counts as an empty ancestry.
    ///
    /// # Errors
    ///
    /// [`SyncError::BranchMissing`] if neither ref exists.
    pub fn between<S>(workspace: &Workspace<S>, branch: &str) -> SyncResult<Self> {
        let branches = workspace.branches();
        let local_head = branches.head(BranchKind::Local, branch);
        let remote_head = branches.head(BranchKind::Remote, branch);

        if local_head.is_none() && remote_head.is_none() {
            return Err(SyncError::BranchMissing {
                branch: branch.to_string(),
            });
        }

        let reach = |head: Option<&CommitHash>| match head {
            Some(head) => ancestry(workspace, head),
            None => Ok(HashSet::new()),
        };
        let local_all = reach(local_head)?;
        let remote_all = reach(remote_head)?;

        Ok(Self {
            local: local_all.difference(&remote_all).cloned().collect(),
            remote: remote_all.difference(&local_all).cloned().collect(),
        })
    }

    /// Classifies the divergence.
    pub fn divergence(&self) -> Divergence {
        match (self.local.is_empty(), self.remote.is_empty()) {
            (true, true) => Divergence::Equal,
            (false, true) => Divergence::LocalAhead,
            (true, false) => Divergence::RemoteAhead,
            (false, false) => Divergence::Diverged,
        }
    }
}
