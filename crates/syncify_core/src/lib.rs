//! # Syncify Core
//!
//! Content-addressed commit graph for git-like state synchronization.
//!
//! This crate provides:
//! - Snapshot and restorer contracts for opaque application state
//! - The four commit variants (initial, command, merge, revert)
//! - Immutable workspaces with local and remote-tracking branches
//! - Ancestry walks and topological ordering
//! - Commit, merge, undo and redo through [`WorkspaceManipulator`]
//!
//! ## Key Invariants
//!
//! - A commit hash depends only on the commit's own defining fields
//! - A workspace holds at most one initial commit
//! - Parents are always added before their children
//! - Every branch head refers to a commit in the workspace
//! - Workspaces are never mutated; every operation returns a new value
//!
//! ## Example
//!
//! ```rust,ignore
//! use syncify_core::{Workspace, WorkspaceManipulator, MAIN_BRANCH};
//!
//! let ws = WorkspaceManipulator::new(Workspace::make_new(state))
//!     .apply(command)?
//!     .undo()?
//!     .into_workspace();
//! let current = ws.head_state(MAIN_BRANCH)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod branches;
mod commit;
mod error;
mod hash;
mod snapshot;
mod workspace;

#[cfg(test)]
mod test_support;

pub use branches::{branch_id, Branch, BranchKind, BranchRef, Branches, MAIN_BRANCH};
pub use commit::{
    restore_commit, CommandCommit, Commit, CommitKind, CommitResolver, CommitSnapshot,
    InitialCommit, MergeCommit, RevertCommit,
};
pub use error::{CoreError, CoreResult};
pub use hash::CommitHash;
pub use snapshot::{Command, CommandRef, Memento, Restorer, Snapshot, State};
pub use workspace::{
    ancestry, ancestry_until, replay_chain, topological_order, Workspace, WorkspaceId,
    WorkspaceManipulator,
};
