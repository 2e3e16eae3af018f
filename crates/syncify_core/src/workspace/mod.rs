//! The immutable workspace: a commit DAG plus branch refs.

mod manipulator;
mod navigation;

pub use manipulator::WorkspaceManipulator;
pub use navigation::{ancestry, ancestry_until, replay_chain, topological_order};

use crate::branches::{Branch, BranchKind, Branches, MAIN_BRANCH};
use crate::commit::{Commit, CommitResolver, InitialCommit};
use crate::error::{CoreError, CoreResult};
use crate::hash::CommitHash;
use crate::snapshot::State;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of a workspace.
///
/// Carried through every derived workspace value; it is not part of
/// workspace equality.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkspaceId(Uuid);

impl WorkspaceId {
    /// Creates a new random workspace ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a workspace ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkspaceId({})", self.0)
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type CommitMap<S> = HashMap<CommitHash, Arc<Commit<S>>>;

/// An immutable commit graph with named branch refs.
///
/// Every mutator validates first and returns a new workspace; the receiver
/// is never altered. Cloning is cheap: the commit map is shared.
///
/// Invariants:
/// 1. at most one initial commit
/// 2. every parent of every commit is present
/// 3. commit hashes are unique
/// 4. every branch head is present
pub struct Workspace<S> {
    id: WorkspaceId,
    commits: Arc<CommitMap<S>>,
    branches: Branches,
    initial: Option<CommitHash>,
}

impl<S> Clone for Workspace<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            commits: Arc::clone(&self.commits),
            branches: self.branches.clone(),
            initial: self.initial.clone(),
        }
    }
}

impl<S> fmt::Debug for Workspace<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.id)
            .field("commits", &self.commits.len())
            .field("branches", &self.branches)
            .finish()
    }
}

impl<S> PartialEq for Workspace<S> {
    fn eq(&self, other: &Self) -> bool {
        self.commits.len() == other.commits.len()
            && self.commits.keys().all(|hash| other.commits.contains_key(hash))
            && self.branches == other.branches
    }
}

impl<S> Eq for Workspace<S> {}

impl<S: State> Workspace<S> {
    /// Creates a workspace seeded with an initial commit and a local
    /// `main` branch pointing at it.
    pub fn make_new(initial: S) -> Self {
        Self::make_new_with_id(WorkspaceId::new(), initial)
    }

    /// Like [`make_new`](Self::make_new) with a caller-supplied id.
    pub fn make_new_with_id(id: WorkspaceId, initial: S) -> Self {
        let commit: Commit<S> = InitialCommit::new(initial).into();
        let hash = commit.hash().clone();
        let mut commits = CommitMap::new();
        commits.insert(hash.clone(), Arc::new(commit));

        Self {
            id,
            commits: Arc::new(commits),
            branches: Branches::make_new(Branch::local(MAIN_BRANCH, hash.clone())),
            initial: Some(hash),
        }
    }
}

impl<S> Workspace<S> {
    /// Creates a workspace with no commits and no branches.
    pub fn make_empty() -> Self {
        Self::make_empty_with_id(WorkspaceId::new())
    }

    /// Like [`make_empty`](Self::make_empty) with a caller-supplied id.
    pub fn make_empty_with_id(id: WorkspaceId) -> Self {
        Self {
            id,
            commits: Arc::new(CommitMap::new()),
            branches: Branches::make_empty(),
            initial: None,
        }
    }

    /// Returns the workspace id.
    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    /// Returns the branch refs.
    pub fn branches(&self) -> &Branches {
        &self.branches
    }

    /// Returns the hash of the initial commit.
    pub fn initial_hash(&self) -> CoreResult<&CommitHash> {
        self.initial.as_ref().ok_or(CoreError::NoInitialCommit)
    }

    /// Returns the commit with the given hash.
    pub fn commit(&self, hash: &CommitHash) -> CoreResult<&Commit<S>> {
        self.find_commit(hash)
            .ok_or_else(|| CoreError::CommitNotFound { hash: hash.clone() })
    }

    /// Returns the commit with the given hash, if present.
    pub fn find_commit(&self, hash: &CommitHash) -> Option<&Commit<S>> {
        self.commits.get(hash).map(AsRef::as_ref)
    }

    /// Returns true if the commit is present.
    pub fn has_commit(&self, hash: &CommitHash) -> bool {
        self.commits.contains_key(hash)
    }

    /// Iterates over all commits in no particular order.
    pub fn commits(&self) -> impl Iterator<Item = &Commit<S>> + '_ {
        self.commits.values().map(AsRef::as_ref)
    }

    /// Returns the number of commits.
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Returns true if there are no commits.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Adds one commit.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DuplicateCommit`] if the hash is already present
    /// - [`CoreError::DanglingInitialCommit`] for a parentless commit in a
    ///   non-empty workspace
    /// - [`CoreError::MissingParentCommit`] if a parent is absent
    pub fn add_commit(&self, commit: Commit<S>) -> CoreResult<Self> {
        self.add_commits(std::iter::once(commit))
    }

    /// Adds commits in order. Parents must precede their children.
    ///
    /// Either every commit is added or none is.
    pub fn add_commits<I>(&self, commits: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Commit<S>>,
    {
        let mut map: Option<CommitMap<S>> = None;
        let mut initial = self.initial.clone();

        for commit in commits {
            let current = map.as_ref().unwrap_or(self.commits.as_ref());
            validate_insert(current, &commit)?;

            if commit.is_initial() {
                initial = Some(commit.hash().clone());
            }
            map.get_or_insert_with(|| (*self.commits).clone())
                .insert(commit.hash().clone(), Arc::new(commit));
        }

        Ok(match map {
            Some(commits) => Self {
                id: self.id,
                commits: Arc::new(commits),
                branches: self.branches.clone(),
                initial,
            },
            None => self.clone(),
        })
    }

    /// Replaces the branch refs.
    ///
    /// Fails with [`CoreError::DanglingBranchHead`] if any head is absent.
    pub fn set_branches(&self, branches: Branches) -> CoreResult<Self> {
        if let Some(branch) = branches.all().into_iter().find(|b| !self.has_commit(&b.head)) {
            return Err(CoreError::DanglingBranchHead {
                kind: branch.kind,
                name: branch.name,
                head: branch.head,
            });
        }

        Ok(Self {
            id: self.id,
            commits: Arc::clone(&self.commits),
            branches,
            initial: self.initial.clone(),
        })
    }

    /// Inserts or moves a single branch ref.
    pub fn upsert_branch(&self, branch: Branch) -> CoreResult<Self> {
        self.set_branches(self.branches.upsert(branch))
    }

    /// Returns the head hash of a local branch.
    pub fn head_hash(&self, branch: &str) -> CoreResult<&CommitHash> {
        self.branches
            .head(BranchKind::Local, branch)
            .ok_or_else(|| CoreError::BranchNotFound {
                kind: BranchKind::Local,
                name: branch.to_string(),
            })
    }

    /// Returns the head commit of a local branch.
    pub fn head(&self, branch: &str) -> CoreResult<&Commit<S>> {
        let hash = self.head_hash(branch)?;
        self.commit(hash)
    }
}

impl<S: Clone> Workspace<S> {
    /// Materializes the state at a commit by replaying from the initial
    /// commit.
    pub fn state(&self, hash: &CommitHash) -> CoreResult<S> {
        self.state_at(hash)
    }

    /// Materializes the state at the head of a local branch.
    pub fn head_state(&self, branch: &str) -> CoreResult<S> {
        let hash = self.head_hash(branch)?;
        self.state_at(hash)
    }
}

impl<S: Clone> CommitResolver<S> for Workspace<S> {
    fn resolve(&self, hash: &CommitHash) -> CoreResult<&Commit<S>> {
        self.commit(hash)
    }

    fn state_at(&self, hash: &CommitHash) -> CoreResult<S> {
        // Runs of command commits are folded iteratively so long linear
        // histories do not recurse once per commit.
        let mut commands = Vec::new();
        let mut current = self.commit(hash)?;
        while let Commit::Command(c) = current {
            commands.push(c.command());
            current = self.commit(c.parent())?;
        }

        let base = current.apply(self)?;
        Ok(commands
            .into_iter()
            .rev()
            .fold(base, |state, command| command.apply(&state)))
    }
}

fn validate_insert<S>(commits: &CommitMap<S>, commit: &Commit<S>) -> CoreResult<()> {
    let hash = commit.hash();
    if commits.contains_key(hash) {
        return Err(CoreError::DuplicateCommit { hash: hash.clone() });
    }

    if commit.is_initial() && !commits.is_empty() {
        return Err(CoreError::DanglingInitialCommit { hash: hash.clone() });
    }

    if let Some(parent) = commit.parents().find(|p| !commits.contains_key(*p)) {
        return Err(CoreError::MissingParentCommit {
            commit: hash.clone(),
            parent: parent.clone(),
        });
    }

    Ok(())
}
