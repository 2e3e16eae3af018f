//! Stored shapes of commits and branch refs.

use crate::id::{Identifiable, ItemId};
use serde::{Deserialize, Serialize};
use syncify_core::{branch_id, Branch, BranchKind, CommitHash, CommitSnapshot};
use uuid::Uuid;

/// Storage id of a commit: a UUIDv5 of `"commit/<hash>"`.
pub fn commit_id(hash: &CommitHash) -> Uuid {
    Uuid::new_v5(&Uuid::nil(), format!("commit/{hash}").as_bytes())
}

/// A commit snapshot with its storage id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCommit {
    /// Storage id, derived from the hash.
    pub id: Uuid,
    /// The commit.
    #[serde(flatten)]
    pub snapshot: CommitSnapshot,
}

impl StoredCommit {
    /// Wraps a snapshot.
    pub fn new(snapshot: CommitSnapshot) -> Self {
        Self {
            id: commit_id(&snapshot.hash),
            snapshot,
        }
    }

    /// Returns the commit hash.
    pub fn hash(&self) -> &CommitHash {
        &self.snapshot.hash
    }
}

impl Identifiable for StoredCommit {
    fn id(&self) -> ItemId {
        self.id.into()
    }
}

/// A branch ref with its storage id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBranch {
    /// Storage id, derived from kind and name.
    pub id: Uuid,
    /// Branch name.
    pub name: String,
    /// Commit the branch points at.
    pub head: CommitHash,
    /// Local or remote-tracking.
    pub kind: BranchKind,
}

impl StoredBranch {
    /// Returns the ref without its storage id.
    pub fn to_branch(&self) -> Branch {
        Branch {
            name: self.name.clone(),
            head: self.head.clone(),
            kind: self.kind,
        }
    }
}

impl From<Branch> for StoredBranch {
    fn from(branch: Branch) -> Self {
        Self {
            id: branch.id(),
            name: branch.name,
            head: branch.head,
            kind: branch.kind,
        }
    }
}

impl Identifiable for StoredBranch {
    fn id(&self) -> ItemId {
        self.id.into()
    }
}

/// Repository key of a branch.
pub fn branch_key(kind: BranchKind, name: &str) -> ItemId {
    branch_id(kind, name).into()
}

/// Repository key of a commit.
pub fn commit_key(hash: &CommitHash) -> ItemId {
    commit_id(hash).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_deterministic() {
        let hash = CommitHash::from_hex("abc");
        assert_eq!(commit_id(&hash), commit_id(&CommitHash::from_hex("abc")));
        assert_ne!(commit_id(&hash), commit_id(&CommitHash::from_hex("abd")));
    }

    #[test]
    fn branch_kinds_do_not_collide() {
        let head = CommitHash::from_hex("abc");
        let local = StoredBranch::from(Branch::local("main", head.clone()));
        let remote = StoredBranch::from(Branch::remote("main", head));
        assert_ne!(local.id, remote.id);
        assert_eq!(Identifiable::id(&local), branch_key(BranchKind::Local, "main"));
    }

    #[test]
    fn stored_commit_is_flat() {
        let snapshot = CommitSnapshot {
            kind: "Revert".into(),
            hash: CommitHash::from_hex("abc"),
            parents: vec![CommitHash::from_hex("def")],
            fields: [("target".to_string(), json!("def"))].into_iter().collect(),
        };
        let stored = StoredCommit::new(snapshot.clone());
        let value = serde_json::to_value(&stored).unwrap();

        assert_eq!(value["type"], "Revert");
        assert_eq!(value["target"], "def");
        assert_eq!(value["id"], json!(stored.id.to_string()));

        let back: StoredCommit = serde_json::from_value(value).unwrap();
        assert_eq!(back.snapshot, snapshot);
    }
}
