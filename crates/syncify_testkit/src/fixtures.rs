//! Workspace fixtures.
//!
//! The diverged scenario used throughout the sync tests:
//!
//! ```text
//!            ┌── Set(6)   local
//! Initial(5) ┤
//!            └── Set(7)   remote
//! ```

use crate::test_state::{TestCommand, TestState};
use syncify_core::{Branch, CommitHash, Workspace, WorkspaceManipulator, MAIN_BRANCH};

/// Value of the initial commit in every fixture.
pub const BASE_VALUE: f64 = 5.0;

/// A workspace holding only `Initial(5)` on `main`.
pub fn base_workspace() -> Workspace<TestState> {
    Workspace::make_new(TestState(BASE_VALUE))
}

/// Applies commands in order on `main`.
///
/// # Panics
///
/// Panics if `main` does not exist.
pub fn apply_all(workspace: Workspace<TestState>, commands: &[TestCommand]) -> Workspace<TestState> {
    commands
        .iter()
        .try_fold(WorkspaceManipulator::new(workspace), |m, c| m.apply(c.into_ref()))
        .expect("fixture commands apply to main")
        .into_workspace()
}

/// `Initial(5) -> Set(6)`.
pub fn ahead_local() -> Workspace<TestState> {
    apply_all(base_workspace(), &[TestCommand::Set(6.0)])
}

/// `Initial(5) -> Set(7)`.
pub fn ahead_remote() -> Workspace<TestState> {
    apply_all(base_workspace(), &[TestCommand::Set(7.0)])
}

/// A linear chain of `Set` commands on top of `Initial(5)`.
pub fn linear_workspace(values: &[f64]) -> Workspace<TestState> {
    let commands: Vec<_> = values.iter().map(|v| TestCommand::Set(*v)).collect();
    apply_all(base_workspace(), &commands)
}

/// Returns the head of `main`.
///
/// # Panics
///
/// Panics if `main` does not exist.
pub fn main_head(workspace: &Workspace<TestState>) -> CommitHash {
    workspace
        .head_hash(MAIN_BRANCH)
        .expect("fixture has a main branch")
        .clone()
}

/// Returns the state at the head of `main`.
///
/// # Panics
///
/// Panics if the state cannot be materialized.
pub fn main_state(workspace: &Workspace<TestState>) -> TestState {
    workspace
        .head_state(MAIN_BRANCH)
        .expect("fixture head state materializes")
}

/// Sets the remote-tracking `main` ref.
///
/// # Panics
///
/// Panics if `head` is not in the workspace.
pub fn track_remote(workspace: Workspace<TestState>, head: &CommitHash) -> Workspace<TestState> {
    workspace
        .upsert_branch(Branch::remote(MAIN_BRANCH, head.clone()))
        .expect("remote head is in the workspace")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_share_the_initial_commit() {
        let local = ahead_local();
        let remote = ahead_remote();
        assert_eq!(local.initial_hash().unwrap(), remote.initial_hash().unwrap());
        assert_eq!(main_state(&local), TestState(6.0));
        assert_eq!(main_state(&remote), TestState(7.0));
    }

    #[test]
    fn linear_workspace_ends_at_last_value() {
        let ws = linear_workspace(&[6.0, 8.0]);
        assert_eq!(ws.len(), 3);
        assert_eq!(main_state(&ws), TestState(8.0));
    }

    #[test]
    fn track_remote_sets_remote_ref() {
        let ws = base_workspace();
        let head = main_head(&ws);
        let ws = track_remote(ws, &head);
        assert_eq!(ws.branches().remote(MAIN_BRANCH).unwrap().head, head);
    }
}
