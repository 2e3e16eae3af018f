//! A remote held in memory as a workspace.

use crate::error::{SyncError, SyncResult};
use crate::fetcher::{snapshots_of, RemoteFetcher};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use syncify_core::{
    ancestry, ancestry_until, restore_commit, topological_order, Branch, BranchKind, BranchRef,
    CommitHash, CommitSnapshot, Restorer, State, Workspace,
};
use tracing::{debug, info};

/// A remote backed by an in-memory [`Workspace`].
///
/// The workspace's local branches are the refs the remote publishes.
/// Useful as a test double and for syncing two workspaces in one process.
pub struct WorkspaceRemoteFetcher<S> {
    workspace: RwLock<Workspace<S>>,
    restorer: Arc<dyn Restorer<S>>,
}

impl<S: State> WorkspaceRemoteFetcher<S> {
    /// Creates a remote serving `workspace`.
    pub fn new(workspace: Workspace<S>, restorer: impl Restorer<S> + 'static) -> Self {
        Self {
            workspace: RwLock::new(workspace),
            restorer: Arc::new(restorer),
        }
    }

    /// Creates a remote with no commits and no branches.
    pub fn empty(restorer: impl Restorer<S> + 'static) -> Self {
        Self::new(Workspace::make_empty(), restorer)
    }

    /// Returns the current remote workspace.
    pub fn workspace(&self) -> Workspace<S> {
        self.workspace.read().clone()
    }

    /// Replaces the remote workspace, as if another client had pushed.
    pub fn replace(&self, workspace: Workspace<S>) {
        *self.workspace.write() = workspace;
    }
}

impl<S> fmt::Debug for WorkspaceRemoteFetcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceRemoteFetcher")
            .field("workspace", &*self.workspace.read())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: State> RemoteFetcher for WorkspaceRemoteFetcher<S> {
    async fn branch(&self, branch: &str) -> SyncResult<Option<BranchRef>> {
        Ok(self
            .workspace
            .read()
            .branches()
            .find(BranchKind::Local, branch)
            .map(|b| b.to_ref()))
    }

    async fn fetch(
        &self,
        branch: &str,
        from: Option<&CommitHash>,
    ) -> SyncResult<Vec<CommitSnapshot>> {
        let workspace = self.workspace.read().clone();
        let Some(head) = workspace.branches().head(BranchKind::Local, branch) else {
            return Ok(Vec::new());
        };

        let hashes = match from {
            Some(from) if !workspace.has_commit(from) => return Ok(Vec::new()),
            Some(from) => ancestry_until(&workspace, head, |c| c.hash() == from)?,
            None => ancestry(&workspace, head)?,
        };

        debug!(branch, count = hashes.len(), "serving fetch");
        snapshots_of(&workspace, &hashes)
    }

    async fn push(
        &self,
        commits: Vec<CommitSnapshot>,
        branch: &str,
        new_head: &CommitHash,
    ) -> SyncResult<()> {
        let mut restored = Vec::with_capacity(commits.len());
        for snapshot in &commits {
            restored.push(restore_commit(snapshot, self.restorer.as_ref())?);
        }

        let mut guard = self.workspace.write();
        let current = &*guard;
        let unknown: Vec<_> = restored
            .into_iter()
            .filter(|c| !current.has_commit(c.hash()))
            .collect();
        let with_commits = current.add_commits(topological_order(unknown))?;

        if let Some(old_head) = current.branches().head(BranchKind::Local, branch) {
            if !ancestry(&with_commits, new_head)?.contains(old_head) {
                return Err(SyncError::NonFastForwardPush {
                    branch: branch.to_string(),
                    remote_head: old_head.clone(),
                    new_head: new_head.clone(),
                });
            }
        }

        let updated = with_commits.upsert_branch(Branch::local(branch, new_head.clone()))?;
        info!(branch, head = new_head.short(), "accepted push");
        *guard = updated;
        Ok(())
    }
}
