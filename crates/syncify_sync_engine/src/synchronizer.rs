//! Fetch, create-remote-if-missing, classify, then fast-forward, push or
//! report a conflict.

use crate::differences::{Differences, Divergence};
use crate::error::{SyncError, SyncResult};
use crate::fetcher::{snapshots_of, RemoteFetcher};
use std::fmt;
use std::sync::Arc;
use syncify_core::{
    ancestry, restore_commit, topological_order, Branch, BranchKind, Branches, CommitHash,
    CommitSnapshot, Restorer, State, Workspace, WorkspaceManipulator,
};
use tracing::{debug, info, warn};

/// Result of synchronizing one branch.
#[derive(Debug, Clone)]
pub enum SyncOutcome<S> {
    /// Local and remote refs agree.
    Synced(Workspace<S>),
    /// Both sides have commits the other lacks.
    Conflict(Conflict<S>),
}

impl<S> SyncOutcome<S> {
    /// Returns the resulting workspace.
    pub fn workspace(&self) -> &Workspace<S> {
        match self {
            SyncOutcome::Synced(ws) => ws,
            SyncOutcome::Conflict(c) => c.workspace(),
        }
    }

    /// Consumes the outcome, returning its workspace.
    pub fn into_workspace(self) -> Workspace<S> {
        match self {
            SyncOutcome::Synced(ws) => ws,
            SyncOutcome::Conflict(c) => c.workspace,
        }
    }

    /// Returns true for [`SyncOutcome::Synced`].
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced(_))
    }

    /// Returns the conflict, if any.
    pub fn conflict(&self) -> Option<&Conflict<S>> {
        match self {
            SyncOutcome::Conflict(c) => Some(c),
            SyncOutcome::Synced(_) => None,
        }
    }
}

/// Diverged local and remote-tracking refs of one branch.
///
/// Both refs are left where they were. Resolve by picking a side, which
/// records a merge commit so the losing side stays in history.
#[derive(Debug, Clone)]
pub struct Conflict<S> {
    workspace: Workspace<S>,
    branch: String,
    local_head: CommitHash,
    remote_head: CommitHash,
}

impl<S> Conflict<S> {
    /// Captures the refs of `branch` in `workspace`.
    ///
    /// # Errors
    ///
    /// [`SyncError::MissingLocalBranch`] or [`SyncError::BranchMissing`]
    /// when a ref is absent.
    pub fn new(workspace: Workspace<S>, branch: impl Into<String>) -> SyncResult<Self> {
        let branch = branch.into();
        let local_head = workspace
            .branches()
            .head(BranchKind::Local, &branch)
            .cloned()
            .ok_or_else(|| SyncError::MissingLocalBranch {
                branch: branch.clone(),
            })?;
        let remote_head = workspace
            .branches()
            .head(BranchKind::Remote, &branch)
            .cloned()
            .ok_or_else(|| SyncError::BranchMissing {
                branch: branch.clone(),
            })?;

        Ok(Self {
            workspace,
            branch,
            local_head,
            remote_head,
        })
    }

    /// Returns the conflicted workspace.
    pub fn workspace(&self) -> &Workspace<S> {
        &self.workspace
    }

    /// Returns the branch name.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Returns the local head.
    pub fn local_head(&self) -> &CommitHash {
        &self.local_head
    }

    /// Returns the remote-tracking head.
    pub fn remote_head(&self) -> &CommitHash {
        &self.remote_head
    }
}

impl<S: State> Conflict<S> {
    /// Returns the state at the local head.
    pub fn local_state(&self) -> SyncResult<S> {
        Ok(self.workspace.state(&self.local_head)?)
    }

    /// Returns the state at the remote-tracking head.
    pub fn remote_state(&self) -> SyncResult<S> {
        Ok(self.workspace.state(&self.remote_head)?)
    }

    /// Resolves by keeping the local state. The merge has the remote head
    /// as a parent, so the next synchronization pushes it.
    pub fn take_local(self) -> SyncResult<Workspace<S>> {
        info!(branch = %self.branch, "conflict resolved keeping local");
        Ok(WorkspaceManipulator::new(self.workspace)
            .on_branch(self.branch)
            .merge_source(&self.remote_head)?
            .into_workspace())
    }

    /// Resolves by adopting the remote state.
    pub fn take_remote(self) -> SyncResult<Workspace<S>> {
        info!(branch = %self.branch, "conflict resolved accepting remote");
        Ok(WorkspaceManipulator::new(self.workspace)
            .on_branch(self.branch)
            .merge_target(&self.remote_head)?
            .into_workspace())
    }
}

/// Synchronizes branches of a local workspace with a remote.
pub struct BranchSynchronizer<S, F> {
    fetcher: F,
    restorer: Arc<dyn Restorer<S>>,
}

impl<S, F> fmt::Debug for BranchSynchronizer<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchSynchronizer").finish_non_exhaustive()
    }
}

impl<S: State, F: RemoteFetcher> BranchSynchronizer<S, F> {
    /// Creates a synchronizer. `restorer` rehydrates fetched commits.
    pub fn new(fetcher: F, restorer: impl Restorer<S> + 'static) -> Self {
        Self {
            fetcher,
            restorer: Arc::new(restorer),
        }
    }

    /// Returns the fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs a full cycle on `branch`: [`fetch`](Self::fetch), then
    /// [`ensure_remote_branch`](Self::ensure_remote_branch), then
    /// [`reconcile`](Self::reconcile).
    ///
    /// On failure the workspace passed in is untouched; callers that
    /// want to keep fetched commits run the steps themselves.
    pub async fn synchronize(
        &self,
        workspace: Workspace<S>,
        branch: &str,
    ) -> SyncResult<SyncOutcome<S>> {
        let workspace = self.fetch(workspace, branch).await?;
        let workspace = self.ensure_remote_branch(workspace, branch).await?;
        let outcome = self.reconcile(workspace, branch).await?;

        match &outcome {
            SyncOutcome::Synced(ws) => info!(branch, commits = ws.len(), "branch synced"),
            SyncOutcome::Conflict(c) => info!(
                branch,
                local = c.local_head().short(),
                remote = c.remote_head().short(),
                "branch in conflict"
            ),
        }
        Ok(outcome)
    }

    /// Pulls the remote's new commits for `branch` and moves the
    /// remote-tracking ref to the remote head. A branch the remote does
    /// not know leaves the workspace unchanged.
    pub async fn fetch(&self, workspace: Workspace<S>, branch: &str) -> SyncResult<Workspace<S>> {
        let Some(remote) = self.fetcher.branch(branch).await? else {
            debug!(branch, "remote has no such branch");
            return Ok(workspace);
        };

        let from = workspace
            .branches()
            .head(BranchKind::Remote, branch)
            .or_else(|| workspace.initial_hash().ok())
            .cloned();
        let batch = self.fetcher.fetch(branch, from.as_ref()).await?;
        let mut workspace = self.absorb(workspace, batch)?;

        if !workspace.has_commit(&remote.head) {
            warn!(
                branch,
                head = remote.head.short(),
                "incremental fetch missed the remote head, fetching everything"
            );
            let batch = self.fetcher.fetch(branch, None).await?;
            workspace = self.absorb(workspace, batch)?;
        }

        Ok(workspace.upsert_branch(Branch::remote(branch, remote.head))?)
    }

    /// Publishes `branch` on the remote if it has never been pushed.
    ///
    /// # Errors
    ///
    /// [`SyncError::MissingLocalBranch`] if the workspace has no local
    /// ref for `branch`.
    pub async fn ensure_remote_branch(
        &self,
        workspace: Workspace<S>,
        branch: &str,
    ) -> SyncResult<Workspace<S>> {
        let Some(local) = workspace.branches().head(BranchKind::Local, branch).cloned() else {
            return Err(SyncError::MissingLocalBranch {
                branch: branch.to_string(),
            });
        };
        if workspace.branches().contains_remote(branch) {
            return Ok(workspace);
        }

        let commits = snapshots_of(&workspace, &ancestry(&workspace, &local)?)?;
        info!(branch, commits = commits.len(), "creating remote branch");
        self.fetcher.push(commits, branch, &local).await?;

        Ok(workspace.upsert_branch(Branch::remote(branch, local))?)
    }

    /// Classifies the refs of `branch` and fast-forwards, pushes or
    /// reports a conflict.
    pub async fn reconcile(
        &self,
        workspace: Workspace<S>,
        branch: &str,
    ) -> SyncResult<SyncOutcome<S>> {
        let differences = Differences::between(&workspace, branch)?;

        match differences.divergence() {
            Divergence::Equal => Ok(SyncOutcome::Synced(workspace)),
            Divergence::RemoteAhead => {
                fast_forward(workspace, branch, &differences).map(SyncOutcome::Synced)
            }
            Divergence::LocalAhead => self
                .push(workspace, branch, &differences)
                .await
                .map(SyncOutcome::Synced),
            Divergence::Diverged => Ok(SyncOutcome::Conflict(Conflict::new(workspace, branch)?)),
        }
    }

    /// Builds a workspace from the remote's full history of `branch`,
    /// with local and remote-tracking refs at the remote head.
    ///
    /// # Errors
    ///
    /// [`SyncError::BranchMissing`] if the remote does not have `branch`.
    pub async fn clone_branch(&self, branch: &str) -> SyncResult<Workspace<S>> {
        let Some(remote) = self.fetcher.branch(branch).await? else {
            return Err(SyncError::BranchMissing {
                branch: branch.to_string(),
            });
        };

        let batch = self.fetcher.fetch(branch, None).await?;
        let workspace = self.absorb(Workspace::make_empty(), batch)?;
        let branches = Branches::make_new(Branch::local(branch, remote.head.clone()))
            .upsert(Branch::remote(branch, remote.head));

        info!(branch, commits = workspace.len(), "cloned branch");
        Ok(workspace.set_branches(branches)?)
    }

    async fn push(
        &self,
        workspace: Workspace<S>,
        branch: &str,
        differences: &Differences,
    ) -> SyncResult<Workspace<S>> {
        if differences.divergence() != Divergence::LocalAhead {
            return Err(SyncError::impossible(branch, "cannot push, local is missing commits"));
        }
        let local = workspace
            .branches()
            .head(BranchKind::Local, branch)
            .cloned()
            .ok_or_else(|| SyncError::impossible(branch, "local ahead without a local ref"))?;

        let commits = snapshots_of(&workspace, &differences.local)?;
        debug!(branch, commits = commits.len(), head = local.short(), "pushing");
        self.fetcher.push(commits, branch, &local).await?;

        Ok(workspace.upsert_branch(Branch::remote(branch, local))?)
    }

    /// Adds the commits of `batch` the workspace does not have yet.
    fn absorb(&self, workspace: Workspace<S>, batch: Vec<CommitSnapshot>) -> SyncResult<Workspace<S>> {
        let mut commits = Vec::new();
        for snapshot in batch.iter().filter(|s| !workspace.has_commit(&s.hash)) {
            commits.push(restore_commit(snapshot, self.restorer.as_ref())?);
        }
        if commits.is_empty() {
            return Ok(workspace);
        }

        debug!(count = commits.len(), "absorbing fetched commits");
        Ok(workspace.add_commits(topological_order(commits))?)
    }
}

fn fast_forward<S>(
    workspace: Workspace<S>,
    branch: &str,
    differences: &Differences,
) -> SyncResult<Workspace<S>> {
    if differences.divergence() != Divergence::RemoteAhead {
        return Err(SyncError::impossible(branch, "cannot fast-forward, remote not ahead"));
    }
    let remote = workspace
        .branches()
        .head(BranchKind::Remote, branch)
        .cloned()
        .ok_or_else(|| SyncError::impossible(branch, "remote ahead without a remote ref"))?;
    if !workspace.branches().contains_local(branch) {
        return Err(SyncError::MissingLocalBranch {
            branch: branch.to_string(),
        });
    }

    debug!(branch, head = remote.short(), "fast-forwarding");
    Ok(workspace.upsert_branch(Branch::local(branch, remote))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace_fetcher::WorkspaceRemoteFetcher;
    use syncify_core::MAIN_BRANCH;
    use syncify_testkit::prelude::*;

    type Remote = Arc<WorkspaceRemoteFetcher<TestState>>;

    fn synchronizer(remote: Workspace<TestState>) -> (Remote, BranchSynchronizer<TestState, Remote>) {
        let fetcher = Arc::new(WorkspaceRemoteFetcher::new(remote, TestRestorer));
        let sync = BranchSynchronizer::new(Arc::clone(&fetcher), TestRestorer);
        (fetcher, sync)
    }

    #[tokio::test]
    async fn equal_branches_are_synced() {
        let ws = ahead_local();
        let head = main_head(&ws);
        let (_, sync) = synchronizer(ws.clone());
        let local = track_remote(ws, &head);

        let outcome = sync.synchronize(local.clone(), MAIN_BRANCH).await.unwrap();
        assert!(outcome.is_synced());
        assert_eq!(outcome.into_workspace(), local);
    }

    #[tokio::test]
    async fn fetch_adds_remote_commits_and_ref() {
        let remote = linear_workspace(&[6.0, 7.0]);
        let remote_head = main_head(&remote);
        let (_, sync) = synchronizer(remote);

        let fetched = sync.fetch(base_workspace(), MAIN_BRANCH).await.unwrap();
        assert_eq!(fetched.len(), 3);
        assert_eq!(fetched.branches().remote(MAIN_BRANCH).unwrap().head, remote_head);
        // The local ref has not moved yet.
        assert_eq!(main_state(&fetched), TestState(5.0));
    }

    #[tokio::test]
    async fn fetch_skips_unknown_remote_branch() {
        let (_, sync) = synchronizer(Workspace::make_empty());
        let local = ahead_local();
        let fetched = sync.fetch(local.clone(), MAIN_BRANCH).await.unwrap();
        assert_eq!(fetched, local);
    }

    #[tokio::test]
    async fn fast_forward_moves_local_ref() {
        let remote = linear_workspace(&[6.0, 7.0]);
        let (_, sync) = synchronizer(remote);

        let outcome = sync.synchronize(base_workspace(), MAIN_BRANCH).await.unwrap();
        assert!(outcome.is_synced());
        assert_eq!(main_state(outcome.workspace()), TestState(7.0));
    }

    #[tokio::test]
    async fn local_ahead_pushes() {
        let (remote, sync) = synchronizer(base_workspace());
        let local = apply_all(base_workspace(), &[TestCommand::Add(3.0)]);

        let outcome = sync.synchronize(local, MAIN_BRANCH).await.unwrap();
        let ws = outcome.into_workspace();
        assert_eq!(ws.branches().remote(MAIN_BRANCH).unwrap().head, main_head(&ws));
        assert_eq!(main_state(&remote.workspace()), TestState(8.0));
    }

    #[tokio::test]
    async fn missing_remote_branch_is_created() {
        let (remote, sync) = synchronizer(Workspace::make_empty());
        let local = ahead_local();

        let outcome = sync.synchronize(local.clone(), MAIN_BRANCH).await.unwrap();
        assert!(outcome.is_synced());
        assert_eq!(remote.workspace(), local);
    }

    #[tokio::test]
    async fn missing_local_branch_fails() {
        let (_, sync) = synchronizer(ahead_remote());
        let err = sync
            .ensure_remote_branch(Workspace::make_empty(), MAIN_BRANCH)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingLocalBranch { .. }));
    }

    #[tokio::test]
    async fn diverged_reports_conflict() {
        let (_, sync) = synchronizer(ahead_remote());

        let outcome = sync.synchronize(ahead_local(), MAIN_BRANCH).await.unwrap();
        let conflict = outcome.conflict().unwrap();
        assert_eq!(conflict.branch(), MAIN_BRANCH);
        assert_eq!(conflict.local_state().unwrap(), TestState(6.0));
        assert_eq!(conflict.remote_state().unwrap(), TestState(7.0));
    }

    #[tokio::test]
    async fn take_local_then_sync_pushes_merge() {
        let (remote, sync) = synchronizer(ahead_remote());

        let outcome = sync.synchronize(ahead_local(), MAIN_BRANCH).await.unwrap();
        let SyncOutcome::Conflict(conflict) = outcome else {
            panic!("expected a conflict");
        };
        let resolved = conflict.take_local().unwrap();
        assert_eq!(main_state(&resolved), TestState(6.0));

        let outcome = sync.synchronize(resolved, MAIN_BRANCH).await.unwrap();
        assert!(outcome.is_synced());
        assert_eq!(main_state(&remote.workspace()), TestState(6.0));
    }

    #[tokio::test]
    async fn take_remote_adopts_remote_state() {
        let (_, sync) = synchronizer(ahead_remote());

        let outcome = sync.synchronize(ahead_local(), MAIN_BRANCH).await.unwrap();
        let SyncOutcome::Conflict(conflict) = outcome else {
            panic!("expected a conflict");
        };
        let resolved = conflict.take_remote().unwrap();
        assert_eq!(main_state(&resolved), TestState(7.0));
    }

    #[tokio::test]
    async fn clone_branch_copies_history() {
        let remote = linear_workspace(&[6.0, 8.0]);
        let (_, sync) = synchronizer(remote.clone());

        let cloned = sync.clone_branch(MAIN_BRANCH).await.unwrap();
        assert_eq!(cloned.len(), remote.len());
        assert_eq!(main_state(&cloned), TestState(8.0));
        assert!(cloned.branches().contains_remote(MAIN_BRANCH));

        let err = sync.clone_branch("drafts").await.unwrap_err();
        assert!(matches!(err, SyncError::BranchMissing { .. }));
    }

    #[test]
    fn fast_forward_guard_rejects_wrong_divergence() {
        let ws = ahead_local();
        let diff = Differences::between(&ws, MAIN_BRANCH).unwrap();
        let err = fast_forward(ws, MAIN_BRANCH, &diff).unwrap_err();
        assert!(matches!(err, SyncError::ImpossibleSyncState { .. }));
    }
}
