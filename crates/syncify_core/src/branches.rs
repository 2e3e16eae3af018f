//! Named branch refs.

use crate::error::{CoreError, CoreResult};
use crate::hash::CommitHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Name of the default branch.
pub const MAIN_BRANCH: &str = "main";

/// Whether a ref tracks local work or mirrors a remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BranchKind {
    /// A branch the user commits to.
    Local,
    /// The last known position of the branch on the remote.
    Remote,
}

impl BranchKind {
    /// Returns a lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchKind::Local => "local",
            BranchKind::Remote => "remote",
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named pointer to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Commit the branch points at.
    pub head: CommitHash,
    /// Local or remote-tracking.
    pub kind: BranchKind,
}

impl Branch {
    /// Creates a local branch.
    pub fn local(name: impl Into<String>, head: CommitHash) -> Self {
        Self {
            name: name.into(),
            head,
            kind: BranchKind::Local,
        }
    }

    /// Creates a remote-tracking branch.
    pub fn remote(name: impl Into<String>, head: CommitHash) -> Self {
        Self {
            name: name.into(),
            head,
            kind: BranchKind::Remote,
        }
    }

    /// Returns the storage id of this branch.
    ///
    /// See [`branch_id`].
    pub fn id(&self) -> Uuid {
        branch_id(self.kind, &self.name)
    }

    /// Returns the wire form, dropping the kind.
    pub fn to_ref(&self) -> BranchRef {
        BranchRef {
            name: self.name.clone(),
            head: self.head.clone(),
        }
    }
}

/// Storage id for a branch ref.
///
/// A UUIDv5 of `"<kind>/<name>"`, so the local and remote refs of the same
/// branch never share a key.
pub fn branch_id(kind: BranchKind, name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::nil(), format!("{kind}/{name}").as_bytes())
}

/// The transmitted form of a branch ref. The kind is implied by the
/// collection the ref travels in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchRef {
    /// Branch name.
    pub name: String,
    /// Commit the branch points at.
    pub head: CommitHash,
}

impl BranchRef {
    /// Creates a branch ref.
    pub fn new(name: impl Into<String>, head: CommitHash) -> Self {
        Self {
            name: name.into(),
            head,
        }
    }

    /// Attaches a kind.
    pub fn into_branch(self, kind: BranchKind) -> Branch {
        Branch {
            name: self.name,
            head: self.head,
            kind,
        }
    }
}

/// An immutable collection of branches keyed by kind and name.
///
/// Every mutator returns a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branches {
    local: BTreeMap<String, CommitHash>,
    remote: BTreeMap<String, CommitHash>,
}

impl Branches {
    /// Creates a collection holding a single branch.
    pub fn make_new(branch: Branch) -> Self {
        Self::make_empty().upsert(branch)
    }

    /// Creates an empty collection.
    pub fn make_empty() -> Self {
        Self::default()
    }

    fn map(&self, kind: BranchKind) -> &BTreeMap<String, CommitHash> {
        match kind {
            BranchKind::Local => &self.local,
            BranchKind::Remote => &self.remote,
        }
    }

    fn map_mut(&mut self, kind: BranchKind) -> &mut BTreeMap<String, CommitHash> {
        match kind {
            BranchKind::Local => &mut self.local,
            BranchKind::Remote => &mut self.remote,
        }
    }

    /// Returns true if a branch of `kind` named `name` exists.
    pub fn contains(&self, kind: BranchKind, name: &str) -> bool {
        self.map(kind).contains_key(name)
    }

    /// Returns true if a local branch named `name` exists.
    pub fn contains_local(&self, name: &str) -> bool {
        self.contains(BranchKind::Local, name)
    }

    /// Returns true if a remote-tracking branch named `name` exists.
    pub fn contains_remote(&self, name: &str) -> bool {
        self.contains(BranchKind::Remote, name)
    }

    /// Returns the branch, if present.
    pub fn find(&self, kind: BranchKind, name: &str) -> Option<Branch> {
        self.map(kind).get(name).map(|head| Branch {
            name: name.to_string(),
            head: head.clone(),
            kind,
        })
    }

    /// Returns the head of a branch, if present.
    pub fn head(&self, kind: BranchKind, name: &str) -> Option<&CommitHash> {
        self.map(kind).get(name)
    }

    /// Returns the branch or fails with [`CoreError::BranchNotFound`].
    pub fn get(&self, kind: BranchKind, name: &str) -> CoreResult<Branch> {
        self.find(kind, name).ok_or_else(|| CoreError::BranchNotFound {
            kind,
            name: name.to_string(),
        })
    }

    /// Returns the local branch.
    pub fn local(&self, name: &str) -> CoreResult<Branch> {
        self.get(BranchKind::Local, name)
    }

    /// Returns the remote-tracking branch.
    pub fn remote(&self, name: &str) -> CoreResult<Branch> {
        self.get(BranchKind::Remote, name)
    }

    /// Inserts or replaces a branch.
    #[must_use]
    pub fn upsert(&self, branch: Branch) -> Self {
        let mut next = self.clone();
        next.map_mut(branch.kind).insert(branch.name, branch.head);
        next
    }

    /// Moves an existing branch.
    ///
    /// Fails with [`CoreError::BranchNotFound`] if the branch does not exist.
    pub fn update(&self, branch: Branch) -> CoreResult<Self> {
        if !self.contains(branch.kind, &branch.name) {
            return Err(CoreError::BranchNotFound {
                kind: branch.kind,
                name: branch.name,
            });
        }
        Ok(self.upsert(branch))
    }

    /// Returns every branch, local ones first, each group ordered by name.
    pub fn all(&self) -> Vec<Branch> {
        let local = self
            .local
            .iter()
            .map(|(name, head)| Branch::local(name.clone(), head.clone()));
        let remote = self
            .remote
            .iter()
            .map(|(name, head)| Branch::remote(name.clone(), head.clone()));
        local.chain(remote).collect()
    }

    /// Returns the local branches.
    pub fn all_local(&self) -> Vec<Branch> {
        self.local
            .iter()
            .map(|(name, head)| Branch::local(name.clone(), head.clone()))
            .collect()
    }

    /// Returns the number of refs of both kinds.
    pub fn len(&self) -> usize {
        self.local.len() + self.remote.len()
    }

    /// Returns true if there are no refs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> CommitHash {
        CommitHash::from_hex(s)
    }

    #[test]
    fn local_and_remote_are_separate() {
        let branches = Branches::make_new(Branch::local(MAIN_BRANCH, h("a")))
            .upsert(Branch::remote(MAIN_BRANCH, h("b")));

        assert_eq!(branches.local(MAIN_BRANCH).unwrap().head, h("a"));
        assert_eq!(branches.remote(MAIN_BRANCH).unwrap().head, h("b"));
        assert_eq!(branches.len(), 2);
    }

    #[test]
    fn update_requires_existing_branch() {
        let branches = Branches::make_new(Branch::local(MAIN_BRANCH, h("a")));

        let err = branches.update(Branch::remote(MAIN_BRANCH, h("b"))).unwrap_err();
        assert_eq!(
            err,
            CoreError::BranchNotFound {
                kind: BranchKind::Remote,
                name: MAIN_BRANCH.into()
            }
        );

        let moved = branches.update(Branch::local(MAIN_BRANCH, h("c"))).unwrap();
        assert_eq!(moved.local(MAIN_BRANCH).unwrap().head, h("c"));
        // The receiver is unchanged.
        assert_eq!(branches.local(MAIN_BRANCH).unwrap().head, h("a"));
    }

    #[test]
    fn ids_disambiguate_kind() {
        let local = Branch::local("main", h("a"));
        let remote = Branch::remote("main", h("a"));
        assert_ne!(local.id(), remote.id());
        assert_eq!(local.id(), branch_id(BranchKind::Local, "main"));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = Branches::make_empty()
            .upsert(Branch::local("x", h("1")))
            .upsert(Branch::local("y", h("2")));
        let b = Branches::make_empty()
            .upsert(Branch::local("y", h("2")))
            .upsert(Branch::local("x", h("1")));
        assert_eq!(a, b);
        assert_eq!(a.all().len(), 2);
    }

    #[test]
    fn branch_ref_round_trip() {
        let branch = Branch::remote("main", h("a"));
        let json = serde_json::to_value(branch.to_ref()).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "main", "head": "a" }));
        let back: BranchRef = serde_json::from_value(json).unwrap();
        assert_eq!(back.into_branch(BranchKind::Remote), branch);
    }
}
