//! A remote backed by a [`StorageService`].

use crate::error::{SyncError, SyncResult};
use crate::fetcher::RemoteFetcher;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use syncify_core::{
    restore_commit, Branch, BranchKind, BranchRef, CommitHash, CommitSnapshot, CoreError,
    Restorer, State,
};
use syncify_storage::{order_snapshots, StorageService};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A remote whose commits and refs live in repositories.
///
/// The stored local branches are the refs the remote publishes. Pushes
/// are serialized by an async lock, so validation and writes are atomic
/// with respect to other pushes through the same fetcher.
pub struct StorageRemoteFetcher<S> {
    storage: StorageService,
    restorer: Arc<dyn Restorer<S>>,
    push_lock: Mutex<()>,
    _state: PhantomData<fn() -> S>,
}

impl<S: State> StorageRemoteFetcher<S> {
    /// Creates a remote over `storage`.
    pub fn new(storage: StorageService, restorer: impl Restorer<S> + 'static) -> Self {
        Self {
            storage,
            restorer: Arc::new(restorer),
            push_lock: Mutex::new(()),
            _state: PhantomData,
        }
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    /// Parents of `hash`, looked up in the pushed batch first.
    async fn parents_of(
        &self,
        hash: &CommitHash,
        batch: &HashMap<&CommitHash, &CommitSnapshot>,
    ) -> SyncResult<Option<Vec<CommitHash>>> {
        if let Some(snapshot) = batch.get(hash) {
            return Ok(Some(snapshot.parents.clone()));
        }
        Ok(self.storage.commit(hash).await?.map(|s| s.parents))
    }

    /// Returns true if `ancestor` is reachable from `head` once `batch`
    /// is stored.
    async fn reaches(
        &self,
        head: &CommitHash,
        ancestor: &CommitHash,
        batch: &HashMap<&CommitHash, &CommitSnapshot>,
    ) -> SyncResult<bool> {
        let mut visited = HashSet::new();
        let mut stack = vec![head.clone()];

        while let Some(hash) = stack.pop() {
            if &hash == ancestor {
                return Ok(true);
            }
            if !visited.insert(hash.clone()) {
                continue;
            }
            let parents = self
                .parents_of(&hash, batch)
                .await?
                .ok_or_else(|| CoreError::CommitNotFound { hash: hash.clone() })?;
            stack.extend(parents);
        }

        Ok(false)
    }
}

impl<S> fmt::Debug for StorageRemoteFetcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageRemoteFetcher")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: State> RemoteFetcher for StorageRemoteFetcher<S> {
    async fn branch(&self, branch: &str) -> SyncResult<Option<BranchRef>> {
        Ok(self
            .storage
            .branch(BranchKind::Local, branch)
            .await?
            .map(|b| b.to_ref()))
    }

    async fn fetch(
        &self,
        branch: &str,
        from: Option<&CommitHash>,
    ) -> SyncResult<Vec<CommitSnapshot>> {
        let Some(head) = self.storage.branch(BranchKind::Local, branch).await? else {
            return Ok(Vec::new());
        };

        let mut known = HashSet::new();
        if let Some(from) = from {
            if !self.storage.has_commit(from).await? {
                return Ok(Vec::new());
            }
            known.insert(from.clone());
        }

        let snapshots = self.storage.ancestry_snapshots(&head.head, &known).await?;
        debug!(branch, count = snapshots.len(), "serving fetch from storage");
        Ok(snapshots)
    }

    async fn push(
        &self,
        commits: Vec<CommitSnapshot>,
        branch: &str,
        new_head: &CommitHash,
    ) -> SyncResult<()> {
        for snapshot in &commits {
            restore_commit(snapshot, self.restorer.as_ref())?;
        }

        let _lock = self.push_lock.lock().await;

        // At most one initial commit may ever be stored.
        let mut new_initial: Option<&CommitHash> = None;
        for snapshot in commits.iter().filter(|s| s.parents.is_empty()) {
            if new_initial == Some(&snapshot.hash)
                || self.storage.has_commit(&snapshot.hash).await?
            {
                continue;
            }
            if new_initial.is_some() || !self.storage.is_empty().await? {
                return Err(CoreError::DanglingInitialCommit {
                    hash: snapshot.hash.clone(),
                }
                .into());
            }
            new_initial = Some(&snapshot.hash);
        }

        let batch: HashMap<&CommitHash, &CommitSnapshot> =
            commits.iter().map(|s| (&s.hash, s)).collect();
        for snapshot in &commits {
            for parent in &snapshot.parents {
                if !batch.contains_key(parent) && !self.storage.has_commit(parent).await? {
                    return Err(CoreError::MissingParentCommit {
                        commit: snapshot.hash.clone(),
                        parent: parent.clone(),
                    }
                    .into());
                }
            }
        }
        if !batch.contains_key(new_head) && !self.storage.has_commit(new_head).await? {
            return Err(CoreError::CommitNotFound {
                hash: new_head.clone(),
            }
            .into());
        }

        if let Some(old) = self.storage.branch(BranchKind::Local, branch).await? {
            if !self.reaches(new_head, &old.head, &batch).await? {
                return Err(SyncError::NonFastForwardPush {
                    branch: branch.to_string(),
                    remote_head: old.head,
                    new_head: new_head.clone(),
                });
            }
        }

        let added = self.storage.put_commits(order_snapshots(commits)).await?;
        self.storage
            .put_branch(Branch::local(branch, new_head.clone()))
            .await?;
        info!(branch, head = new_head.short(), added, "accepted push into storage");
        Ok(())
    }
}
