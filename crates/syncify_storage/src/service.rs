//! Commit and branch persistence over two repositories.

use crate::error::StorageResult;
use crate::memory::InMemoryRepository;
use crate::records::{branch_key, commit_key, StoredBranch, StoredCommit};
use crate::repository::Repository;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use syncify_core::{
    restore_commit, topological_order, Branch, BranchKind, Branches, CommitHash, CommitSnapshot,
    Restorer, State, Workspace,
};
use tracing::debug;

/// Shared handle to a commit repository.
pub type CommitRepository = Arc<dyn Repository<StoredCommit>>;

/// Shared handle to a branch repository.
pub type BranchRepository = Arc<dyn Repository<StoredBranch>>;

/// Persists commit snapshots and branch refs.
///
/// Cloning shares the underlying repositories.
#[derive(Clone)]
pub struct StorageService {
    commits: CommitRepository,
    branches: BranchRepository,
}

impl fmt::Debug for StorageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageService").finish_non_exhaustive()
    }
}

impl StorageService {
    /// Creates a service over the given repositories.
    pub fn new(commits: CommitRepository, branches: BranchRepository) -> Self {
        Self { commits, branches }
    }

    /// Creates a service over empty in-memory repositories.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryRepository::<StoredCommit>::new()),
            Arc::new(InMemoryRepository::<StoredBranch>::new()),
        )
    }

    /// Creates an in-memory service holding every commit of `workspace`
    /// and its local branches.
    pub fn from_workspace<S: State>(workspace: &Workspace<S>) -> StorageResult<Self> {
        let commits = workspace
            .commits()
            .map(|c| StoredCommit::new(c.snapshot()));
        let branches = workspace
            .branches()
            .all_local()
            .into_iter()
            .map(StoredBranch::from);

        Ok(Self::new(
            Arc::new(InMemoryRepository::with_items(commits)?),
            Arc::new(InMemoryRepository::with_items(branches)?),
        ))
    }

    /// Returns the commit repository.
    pub fn commits(&self) -> &CommitRepository {
        &self.commits
    }

    /// Returns the branch repository.
    pub fn branches(&self) -> &BranchRepository {
        &self.branches
    }

    /// Returns true if the commit is stored.
    pub async fn has_commit(&self, hash: &CommitHash) -> StorageResult<bool> {
        self.commits.contains(&commit_key(hash)).await
    }

    /// Returns true if no commit is stored.
    pub async fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.commits.get_all().await?.is_empty())
    }

    /// Returns a stored commit snapshot.
    pub async fn commit(&self, hash: &CommitHash) -> StorageResult<Option<CommitSnapshot>> {
        Ok(self
            .commits
            .find(&commit_key(hash))
            .await?
            .map(|stored| stored.snapshot))
    }

    /// Stores snapshots that are not stored yet. Returns how many were
    /// added.
    pub async fn put_commits(&self, snapshots: Vec<CommitSnapshot>) -> StorageResult<usize> {
        let mut added = 0;
        for snapshot in snapshots {
            if self.has_commit(&snapshot.hash).await? {
                continue;
            }
            self.commits.add(StoredCommit::new(snapshot)).await?;
            added += 1;
        }
        Ok(added)
    }

    /// Returns a stored branch ref.
    pub async fn branch(&self, kind: BranchKind, name: &str) -> StorageResult<Option<Branch>> {
        Ok(self
            .branches
            .find(&branch_key(kind, name))
            .await?
            .map(|stored| stored.to_branch()))
    }

    /// Stores or moves a branch ref.
    pub async fn put_branch(&self, branch: Branch) -> StorageResult<()> {
        self.branches.upsert(StoredBranch::from(branch)).await
    }

    /// Stores every commit and branch ref of `workspace`.
    pub async fn save_workspace<S: State>(&self, workspace: &Workspace<S>) -> StorageResult<()> {
        let snapshots = workspace.commits().map(|c| c.snapshot()).collect();
        let added = self.put_commits(snapshots).await?;

        for branch in workspace.branches().all() {
            self.put_branch(branch).await?;
        }

        debug!(workspace = %workspace.id(), added, "saved workspace");
        Ok(())
    }

    /// Rebuilds a workspace from every stored commit and branch ref.
    ///
    /// Commits are restored through `restorer` and re-ordered so parents
    /// come first.
    pub async fn load_workspace<S: State>(
        &self,
        restorer: &dyn Restorer<S>,
    ) -> StorageResult<Workspace<S>> {
        let mut commits = Vec::new();
        for stored in self.commits.get_all().await? {
            commits.push(restore_commit(&stored.snapshot, restorer)?);
        }

        let mut branches = Branches::make_empty();
        for stored in self.branches.get_all().await? {
            branches = branches.upsert(stored.to_branch());
        }

        let workspace = Workspace::make_empty()
            .add_commits(topological_order(commits))?
            .set_branches(branches)?;
        Ok(workspace)
    }

    /// Returns the snapshots of every stored ancestor of `head`, `head`
    /// included, parents first. Walking stops at hashes in `known`.
    pub async fn ancestry_snapshots(
        &self,
        head: &CommitHash,
        known: &HashSet<CommitHash>,
    ) -> StorageResult<Vec<CommitSnapshot>> {
        let mut visited = HashSet::new();
        let mut stack = vec![head.clone()];
        let mut found = Vec::new();

        while let Some(hash) = stack.pop() {
            if known.contains(&hash) || !visited.insert(hash.clone()) {
                continue;
            }
            let Some(snapshot) = self.commit(&hash).await? else {
                continue;
            };
            stack.extend(snapshot.parents.iter().cloned());
            found.push(snapshot);
        }

        Ok(order_snapshots(found))
    }
}

/// Orders snapshots so parents inside the batch come first.
pub fn order_snapshots(snapshots: Vec<CommitSnapshot>) -> Vec<CommitSnapshot> {
    let in_batch: HashSet<CommitHash> = snapshots.iter().map(|s| s.hash.clone()).collect();
    let mut placed: HashSet<CommitHash> = HashSet::new();
    let mut pending = snapshots;
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let before = pending.len();
        let (ready, rest): (Vec<_>, Vec<_>) = pending.into_iter().partition(|s| {
            s.parents
                .iter()
                .all(|p| !in_batch.contains(p) || placed.contains(p))
        });
        placed.extend(ready.iter().map(|s| s.hash.clone()));
        ordered.extend(ready);
        pending = rest;

        if pending.len() == before {
            // Only reachable with a parent cycle, which hashing rules out.
            ordered.extend(pending);
            break;
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncify_testkit::prelude::*;
    use syncify_core::{replay_chain, MAIN_BRANCH};

    #[tokio::test]
    async fn from_workspace_stores_local_branches_only() {
        let ws = ahead_local();
        let head = main_head(&ws);
        let ws = track_remote(ws, &head);

        let service = StorageService::from_workspace(&ws).unwrap();
        assert_eq!(service.commits().get_all().await.unwrap().len(), 2);
        assert_eq!(service.branches().get_all().await.unwrap().len(), 1);
        assert_eq!(
            service.branch(BranchKind::Local, MAIN_BRANCH).await.unwrap(),
            Some(Branch::local(MAIN_BRANCH, head))
        );
        assert_eq!(service.branch(BranchKind::Remote, MAIN_BRANCH).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let ws = linear_workspace(&[6.0, 8.0, 9.0]);
        let head = main_head(&ws);
        let ws = track_remote(ws, &head);

        let service = StorageService::in_memory();
        service.save_workspace(&ws).await.unwrap();
        // Saving again adds nothing.
        service.save_workspace(&ws).await.unwrap();

        let loaded = service.load_workspace::<TestState>(&TestRestorer).await.unwrap();
        assert_eq!(loaded, ws);
        assert_eq!(main_state(&loaded), TestState(9.0));
    }

    #[tokio::test]
    async fn put_commits_skips_known() {
        let ws = ahead_local();
        let snapshots: Vec<_> = ws.commits().map(|c| c.snapshot()).collect();

        let service = StorageService::in_memory();
        assert_eq!(service.put_commits(snapshots.clone()).await.unwrap(), 2);
        assert_eq!(service.put_commits(snapshots).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ancestry_snapshots_are_parents_first() {
        let ws = linear_workspace(&[6.0, 7.0, 8.0]);
        let head = main_head(&ws);
        let initial = ws.initial_hash().unwrap().clone();
        let service = StorageService::from_workspace(&ws).unwrap();

        let all = service.ancestry_snapshots(&head, &HashSet::new()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].hash, initial);
        assert_eq!(all[3].hash, head);

        let known: HashSet<_> = [initial].into_iter().collect();
        let after = service.ancestry_snapshots(&head, &known).await.unwrap();
        assert_eq!(after.len(), 3);
        assert_eq!(after[2].hash, head);
    }

    #[test]
    fn order_snapshots_sorts_reversed_batch() {
        let ws = linear_workspace(&[6.0, 7.0]);
        let head = main_head(&ws);
        let initial = ws.initial_hash().unwrap().clone();
        let head_first: Vec<_> = replay_chain(&ws, &head)
            .unwrap()
            .into_iter()
            .map(|c| c.snapshot())
            .collect();
        assert_eq!(head_first[0].hash, head);

        let ordered = order_snapshots(head_first);
        assert_eq!(ordered[0].hash, initial);
        assert_eq!(ordered[2].hash, head);
    }
}
