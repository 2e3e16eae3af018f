//! The commit model.
//!
//! Commits are immutable, content-addressed nodes of the history DAG. There
//! are four variants:
//!
//! | Variant | Parents | Effect |
//! |---|---|---|
//! | [`InitialCommit`] | none | seeds the full state |
//! | [`CommandCommit`] | one | applies a command to the parent state |
//! | [`MergeCommit`] | two | keeps the state of the selected parent |
//! | [`RevertCommit`] | one | returns the state from before its target |
//!
//! State is never stored past the initial commit. It is materialized by
//! [`Commit::apply`], which asks a [`CommitResolver`] for ancestor states and
//! layers its own effect on top.

mod command;
mod initial;
mod merge;
mod revert;
mod snapshot;

pub use command::CommandCommit;
pub use initial::InitialCommit;
pub use merge::MergeCommit;
pub use revert::RevertCommit;
pub use snapshot::{restore_commit, CommitSnapshot};

use crate::error::{CoreError, CoreResult};
use crate::hash::CommitHash;
use std::fmt;

/// Read-only access to the commits and states of a history.
///
/// Passed into [`Commit::apply`] and [`Commit::revert`] so commits can
/// request ancestor states without depending on the workspace type.
pub trait CommitResolver<S> {
    /// Looks up a commit by hash.
    fn resolve(&self, hash: &CommitHash) -> CoreResult<&Commit<S>>;

    /// Materializes the state at a commit.
    fn state_at(&self, hash: &CommitHash) -> CoreResult<S>;
}

/// Discriminant of a [`Commit`], used as the snapshot `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitKind {
    /// [`InitialCommit`].
    Initial,
    /// [`CommandCommit`].
    Command,
    /// [`MergeCommit`].
    Merge,
    /// [`RevertCommit`].
    Revert,
}

impl CommitKind {
    /// Returns the snapshot tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitKind::Initial => "Initial",
            CommitKind::Command => "Command",
            CommitKind::Merge => "Merge",
            CommitKind::Revert => "Revert",
        }
    }

    /// Parses a snapshot tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Initial" => Some(CommitKind::Initial),
            "Command" => Some(CommitKind::Command),
            "Merge" => Some(CommitKind::Merge),
            "Revert" => Some(CommitKind::Revert),
            _ => None,
        }
    }
}

impl fmt::Display for CommitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the history DAG.
#[derive(Debug, Clone)]
pub enum Commit<S> {
    /// Root of the history.
    Initial(InitialCommit<S>),
    /// A recorded command.
    Command(CommandCommit<S>),
    /// A resolved divergence.
    Merge(MergeCommit),
    /// An undo or redo.
    Revert(RevertCommit),
}

impl<S> Commit<S> {
    /// Returns the content hash.
    pub fn hash(&self) -> &CommitHash {
        match self {
            Commit::Initial(c) => c.hash(),
            Commit::Command(c) => c.hash(),
            Commit::Merge(c) => c.hash(),
            Commit::Revert(c) => c.hash(),
        }
    }

    /// Returns the variant tag.
    pub fn kind(&self) -> CommitKind {
        match self {
            Commit::Initial(_) => CommitKind::Initial,
            Commit::Command(_) => CommitKind::Command,
            Commit::Merge(_) => CommitKind::Merge,
            Commit::Revert(_) => CommitKind::Revert,
        }
    }

    /// Returns the direct predecessors (zero, one or two).
    ///
    /// A merge yields its target first, then its source.
    pub fn parents(&self) -> impl Iterator<Item = &CommitHash> + '_ {
        let (first, second) = match self {
            Commit::Initial(_) => (None, None),
            Commit::Command(c) => (Some(c.parent()), None),
            Commit::Merge(c) => (Some(c.target()), Some(c.source())),
            Commit::Revert(c) => (Some(c.parent()), None),
        };
        [first, second].into_iter().flatten()
    }

    /// Returns the parent that continues the history line this commit was
    /// made on. `None` for the initial commit, the target for a merge.
    pub fn primary_parent(&self) -> Option<&CommitHash> {
        match self {
            Commit::Initial(_) => None,
            Commit::Command(c) => Some(c.parent()),
            Commit::Merge(c) => Some(c.target()),
            Commit::Revert(c) => Some(c.parent()),
        }
    }

    /// Returns the parent whose state this commit builds on.
    ///
    /// Same as [`primary_parent`](Self::primary_parent) except for merges,
    /// where the selected side is followed. Undo and redo walk this chain.
    pub fn replay_parent(&self) -> Option<&CommitHash> {
        match self {
            Commit::Merge(c) => Some(c.selection()),
            _ => self.primary_parent(),
        }
    }

    /// Returns true for the initial commit.
    pub fn is_initial(&self) -> bool {
        matches!(self, Commit::Initial(_))
    }

    /// Returns the revert commit if this is one.
    pub fn as_revert(&self) -> Option<&RevertCommit> {
        match self {
            Commit::Revert(c) => Some(c),
            _ => None,
        }
    }

    /// Materializes the state at this commit.
    pub fn apply(&self, context: &dyn CommitResolver<S>) -> CoreResult<S>
    where
        S: Clone,
    {
        match self {
            Commit::Initial(c) => Ok(c.state().clone()),
            Commit::Command(c) => {
                let state = context.state_at(c.parent())?;
                Ok(c.command().apply(&state))
            }
            Commit::Merge(c) => context.state_at(c.selection()),
            Commit::Revert(c) => context.resolve(c.target())?.revert(context),
        }
    }

    /// Returns the state from before this commit.
    ///
    /// For a revert this is the state at its target, which is what makes a
    /// revert of a revert act as a redo.
    pub fn revert(&self, context: &dyn CommitResolver<S>) -> CoreResult<S>
    where
        S: Clone,
    {
        match self {
            Commit::Initial(c) => Err(CoreError::CannotRevertInitial {
                hash: c.hash().clone(),
            }),
            Commit::Command(c) => context.state_at(c.parent()),
            Commit::Merge(c) => context.state_at(c.target()),
            Commit::Revert(c) => context.state_at(c.target()),
        }
    }
}

impl<S> From<InitialCommit<S>> for Commit<S> {
    fn from(commit: InitialCommit<S>) -> Self {
        Commit::Initial(commit)
    }
}

impl<S> From<CommandCommit<S>> for Commit<S> {
    fn from(commit: CommandCommit<S>) -> Self {
        Commit::Command(commit)
    }
}

impl<S> From<MergeCommit> for Commit<S> {
    fn from(commit: MergeCommit) -> Self {
        Commit::Merge(commit)
    }
}

impl<S> From<RevertCommit> for Commit<S> {
    fn from(commit: RevertCommit) -> Self {
        Commit::Revert(commit)
    }
}
