//! Repository item identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque key of a repository item: a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Textual id, e.g. a UUID.
    Text(String),
    /// Numeric id.
    Number(u64),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Text(s) => write!(f, "\"{s}\""),
            ItemId::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Text(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId::Text(s)
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId::Number(n)
    }
}

impl From<Uuid> for ItemId {
    fn from(id: Uuid) -> Self {
        ItemId::Text(id.to_string())
    }
}

/// An item with a stable repository key.
pub trait Identifiable {
    /// Returns the key of this item.
    fn id(&self) -> ItemId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(ItemId::from("a").to_string(), "\"a\"");
        assert_eq!(ItemId::from(7u64).to_string(), "7");
    }

    #[test]
    fn untagged_json() {
        assert_eq!(serde_json::to_string(&ItemId::from(7u64)).unwrap(), "7");
        let id: ItemId = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(id, ItemId::from("x"));
    }
}
