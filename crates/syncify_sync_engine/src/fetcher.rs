//! The remote side of synchronization.

use crate::error::SyncResult;
use async_trait::async_trait;
use std::sync::Arc;
use syncify_core::{BranchRef, CommitHash, CommitSnapshot, State, Workspace};
use syncify_storage::order_snapshots;

/// Access to a remote commit store.
///
/// The remote publishes one ref per branch. Implementations may be
/// shared by many local workspaces at once, so `push` must check and
/// apply atomically.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Returns the remote's ref for `branch`, if it has one.
    async fn branch(&self, branch: &str) -> SyncResult<Option<BranchRef>>;

    /// Returns the commits reachable from the remote head of `branch`
    /// that are not `from` or behind it, parents first.
    ///
    /// With `from = None` the whole history is returned. If the remote
    /// does not know `from` (or the branch), the result is empty.
    async fn fetch(
        &self,
        branch: &str,
        from: Option<&CommitHash>,
    ) -> SyncResult<Vec<CommitSnapshot>>;

    /// Stores `commits` and moves the remote ref of `branch` to
    /// `new_head`.
    ///
    /// # Errors
    ///
    /// [`SyncError::NonFastForwardPush`](crate::SyncError::NonFastForwardPush)
    /// if the current remote head is not an ancestor of `new_head`. The
    /// remote is left unchanged on any error.
    async fn push(
        &self,
        commits: Vec<CommitSnapshot>,
        branch: &str,
        new_head: &CommitHash,
    ) -> SyncResult<()>;
}

#[async_trait]
impl<F: RemoteFetcher + ?Sized> RemoteFetcher for Arc<F> {
    async fn branch(&self, branch: &str) -> SyncResult<Option<BranchRef>> {
        (**self).branch(branch).await
    }

    async fn fetch(
        &self,
        branch: &str,
        from: Option<&CommitHash>,
    ) -> SyncResult<Vec<CommitSnapshot>> {
        (**self).fetch(branch, from).await
    }

    async fn push(
        &self,
        commits: Vec<CommitSnapshot>,
        branch: &str,
        new_head: &CommitHash,
    ) -> SyncResult<()> {
        (**self).push(commits, branch, new_head).await
    }
}

/// Snapshots of `hashes` ordered parents first.
pub(crate) fn snapshots_of<'a, S: State>(
    workspace: &Workspace<S>,
    hashes: impl IntoIterator<Item = &'a CommitHash>,
) -> SyncResult<Vec<CommitSnapshot>> {
    let mut snapshots = Vec::new();
    for hash in hashes {
        snapshots.push(workspace.commit(hash)?.snapshot());
    }
    Ok(order_snapshots(snapshots))
}
