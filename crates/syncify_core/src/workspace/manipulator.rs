//! Commit, merge, undo and redo on top of a workspace.
//!
//! Undo state is never stored. Whether a commit is currently undone is
//! derived from the replay chain: a commit is undone when an odd number of
//! reverts stack on top of it (a revert of it, a revert of that revert, and
//! so on). Undo appends a revert of the nearest commit that is not undone;
//! redo appends a revert of the nearest revert that is itself an undo.

use super::navigation::replay_chain;
use super::Workspace;
use crate::branches::{Branch, MAIN_BRANCH};
use crate::commit::{CommandCommit, Commit, MergeCommit, RevertCommit};
use crate::error::{CoreError, CoreResult};
use crate::hash::CommitHash;
use crate::snapshot::{CommandRef, State};
use tracing::debug;

/// Builder over one workspace value.
///
/// Every operation consumes the manipulator and returns a new one wrapping
/// the updated workspace. Operations act on a single local branch, `main`
/// unless changed with [`on_branch`](Self::on_branch).
#[derive(Debug, Clone)]
pub struct WorkspaceManipulator<S> {
    workspace: Workspace<S>,
    branch: String,
}

impl<S> WorkspaceManipulator<S> {
    /// Wraps a workspace, targeting `main`.
    pub fn new(workspace: Workspace<S>) -> Self {
        Self {
            workspace,
            branch: MAIN_BRANCH.to_string(),
        }
    }

    /// Targets another local branch.
    #[must_use]
    pub fn on_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Returns the targeted branch name.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Returns the wrapped workspace.
    pub fn workspace(&self) -> &Workspace<S> {
        &self.workspace
    }

    /// Unwraps the workspace.
    pub fn into_workspace(self) -> Workspace<S> {
        self.workspace
    }

}

impl<S: State> WorkspaceManipulator<S> {
    fn head(&self) -> CoreResult<CommitHash> {
        self.workspace.head_hash(&self.branch).cloned()
    }

    /// Appends a pre-built commit and moves the branch to it.
    ///
    /// The branch must already exist.
    pub fn commit(self, commit: Commit<S>) -> CoreResult<Self> {
        let head = Branch::local(self.branch.clone(), commit.hash().clone());
        let branches = self.workspace.branches().update(head)?;
        let workspace = self.workspace.add_commit(commit)?.set_branches(branches)?;

        Ok(Self {
            workspace,
            branch: self.branch,
        })
    }

    /// Records a command on top of the branch head.
    pub fn apply(self, command: CommandRef<S>) -> CoreResult<Self> {
        let commit = CommandCommit::new(self.head()?, command);
        self.commit(commit.into())
    }

    /// Merges `target` into the branch, keeping the state of `target`.
    pub fn merge_target(self, target: &CommitHash) -> CoreResult<Self> {
        let head = self.head()?;
        let merge = MergeCommit::new(target.clone(), head, target.clone())?;
        debug!(branch = %self.branch, target = target.short(), "merge keeping target");
        self.commit(merge.into())
    }

    /// Merges `target` into the branch, keeping the state of the current
    /// head.
    pub fn merge_source(self, target: &CommitHash) -> CoreResult<Self> {
        let head = self.head()?;
        let merge = MergeCommit::new(target.clone(), head.clone(), head)?;
        debug!(branch = %self.branch, target = target.short(), "merge keeping source");
        self.commit(merge.into())
    }

    /// Returns true if [`undo`](Self::undo) would succeed.
    pub fn can_undo(&self) -> bool {
        matches!(self.find_commit_to_undo(), Ok(Some(_)))
    }

    /// Returns true if [`redo`](Self::redo) would succeed.
    pub fn can_redo(&self) -> bool {
        matches!(self.find_commit_to_redo(), Ok(Some(_)))
    }

    /// Reverts the nearest commit on the branch that is not already
    /// undone.
    ///
    /// Fails with [`CoreError::NoCommitsToUndo`] when only the initial
    /// commit and undone commits remain.
    pub fn undo(self) -> CoreResult<Self> {
        let target = self
            .find_commit_to_undo()?
            .ok_or_else(|| CoreError::NoCommitsToUndo {
                branch: self.branch.clone(),
            })?;
        debug!(branch = %self.branch, target = target.short(), "undo");
        let revert = RevertCommit::new(self.head()?, target);
        self.commit(revert.into())
    }

    /// Reverts the nearest undo on the branch, restoring what it removed.
    ///
    /// Only the run of reverts at the head of the branch is considered; any
    /// other commit ends the redo history. Fails with
    /// [`CoreError::NoCommitsToRedo`] if that run holds no undo.
    pub fn redo(self) -> CoreResult<Self> {
        let target = self
            .find_commit_to_redo()?
            .ok_or_else(|| CoreError::NoCommitsToRedo {
                branch: self.branch.clone(),
            })?;
        debug!(branch = %self.branch, target = target.short(), "redo");
        let revert = RevertCommit::new(self.head()?, target);
        self.commit(revert.into())
    }

    fn find_commit_to_undo(&self) -> CoreResult<Option<CommitHash>> {
        let chain = replay_chain(&self.workspace, &self.head()?)?;

        for commit in &chain {
            if commit.is_initial() {
                continue;
            }
            if !self.is_undo(commit, &chain)? {
                return Ok(Some(commit.hash().clone()));
            }
        }

        Ok(None)
    }

    fn find_commit_to_redo(&self) -> CoreResult<Option<CommitHash>> {
        let chain: Vec<&Commit<S>> = replay_chain(&self.workspace, &self.head()?)?
            .into_iter()
            .take_while(|c| c.as_revert().is_some())
            .collect();

        for commit in &chain {
            if self.is_undo(commit, &chain)? {
                return Ok(Some(commit.hash().clone()));
            }
        }

        Ok(None)
    }

    /// True if the edit underlying `commit` is currently undone.
    fn is_undo(&self, commit: &Commit<S>, chain: &[&Commit<S>]) -> CoreResult<bool> {
        let target = self.underlying_edit(commit)?;
        Ok(times_undone(target, chain) % 2 == 1)
    }

    /// Follows revert targets down to the first commit that is not a
    /// revert.
    fn underlying_edit<'a>(&'a self, commit: &'a Commit<S>) -> CoreResult<&'a Commit<S>> {
        let mut current = commit;
        while let Some(revert) = current.as_revert() {
            current = self.workspace.commit(revert.target())?;
        }
        Ok(current)
    }
}

/// Counts the stack of reverts on `target` within `chain`: the revert of
/// `target`, the revert of that revert, and so on.
fn times_undone<S>(target: &Commit<S>, chain: &[&Commit<S>]) -> usize {
    let mut times = 0;
    let mut current = target.hash();

    while let Some(revert) = chain
        .iter()
        .find(|c| c.as_revert().is_some_and(|r| r.target() == current))
    {
        times += 1;
        current = revert.hash();
    }

    times
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Counter, CounterCommand};
    use std::sync::Arc;

    fn base() -> WorkspaceManipulator<Counter> {
        WorkspaceManipulator::new(Workspace::make_new(Counter(5)))
    }

    fn set(value: i64) -> CommandRef<Counter> {
        Arc::new(CounterCommand::Set(value))
    }

    fn state(m: &WorkspaceManipulator<Counter>) -> Counter {
        m.workspace().head_state(m.branch()).unwrap()
    }

    #[test]
    fn apply_advances_branch() {
        let m = base().apply(set(6)).unwrap();
        assert_eq!(state(&m), Counter(6));
        assert_eq!(m.workspace().len(), 2);
    }

    #[test]
    fn apply_on_missing_branch_fails() {
        let err = base().on_branch("feature").apply(set(6)).unwrap_err();
        assert!(matches!(err, CoreError::BranchNotFound { .. }));
    }

    #[test]
    fn undo_then_redo() {
        let m = base().apply(set(6)).unwrap();
        let m = m.undo().unwrap();
        assert_eq!(state(&m), Counter(5));
        let m = m.redo().unwrap();
        assert_eq!(state(&m), Counter(6));
    }

    #[test]
    fn consecutive_undos_walk_back() {
        let m = base().apply(set(6)).unwrap().apply(set(7)).unwrap();
        let m = m.undo().unwrap();
        assert_eq!(state(&m), Counter(6));
        let m = m.undo().unwrap();
        assert_eq!(state(&m), Counter(5));
        assert!(!m.can_undo());
        assert!(matches!(m.clone().undo(), Err(CoreError::NoCommitsToUndo { .. })));

        // Redo restores in reverse order.
        let m = m.redo().unwrap();
        assert_eq!(state(&m), Counter(6));
        let m = m.redo().unwrap();
        assert_eq!(state(&m), Counter(7));
        assert!(!m.can_redo());
    }

    #[test]
    fn undo_after_redo_undoes_same_edit() {
        let m = base().apply(set(6)).unwrap().undo().unwrap().redo().unwrap();
        let m = m.undo().unwrap();
        assert_eq!(state(&m), Counter(5));
        let m = m.redo().unwrap();
        assert_eq!(state(&m), Counter(6));
    }

    #[test]
    fn new_edit_clears_redo() {
        let m = base().apply(set(6)).unwrap().undo().unwrap();
        assert!(m.can_redo());
        let m = m.apply(set(9)).unwrap();
        assert!(!m.can_redo());
        assert!(matches!(m.redo(), Err(CoreError::NoCommitsToRedo { .. })));
    }

    #[test]
    fn nothing_to_undo_on_fresh_workspace() {
        let m = base();
        assert!(!m.can_undo());
        assert!(!m.can_redo());
        let err = m.undo().unwrap_err();
        assert_eq!(err, CoreError::NoCommitsToUndo { branch: "main".into() });
    }

    #[test]
    fn undo_stays_on_its_branch() {
        let ws = base().apply(set(6)).unwrap().into_workspace();
        let head = ws.head_hash(MAIN_BRANCH).unwrap().clone();
        let ws = ws.upsert_branch(Branch::local("feature", head)).unwrap();

        let m = WorkspaceManipulator::new(ws).on_branch("feature").undo().unwrap();
        assert_eq!(m.workspace().head_state("feature").unwrap(), Counter(5));
        assert_eq!(m.workspace().head_state(MAIN_BRANCH).unwrap(), Counter(6));
    }

    #[test]
    fn merge_target_and_source() {
        let ws = base().into_workspace();
        let initial = ws.initial_hash().unwrap().clone();
        let remote: Commit<Counter> = CommandCommit::new(initial, set(7)).into();
        let remote_hash = remote.hash().clone();
        let ws = ws.add_commit(remote).unwrap();

        let local = WorkspaceManipulator::new(ws).apply(set(6)).unwrap();

        let keep_remote = local.clone().merge_target(&remote_hash).unwrap();
        assert_eq!(state(&keep_remote), Counter(7));

        let keep_local = local.merge_source(&remote_hash).unwrap();
        assert_eq!(state(&keep_local), Counter(6));
    }

    #[test]
    fn undo_a_merge_returns_to_target() {
        let ws = base().into_workspace();
        let initial = ws.initial_hash().unwrap().clone();
        let remote: Commit<Counter> = CommandCommit::new(initial, set(7)).into();
        let remote_hash = remote.hash().clone();
        let ws = ws.add_commit(remote).unwrap();

        let m = WorkspaceManipulator::new(ws)
            .apply(set(6))
            .unwrap()
            .merge_source(&remote_hash)
            .unwrap();
        assert_eq!(state(&m), Counter(6));

        let m = m.undo().unwrap();
        assert_eq!(state(&m), Counter(7));
    }
}
