//! Snapshots and the restorer contract.
//!
//! Application state and commands are opaque to the core. They cross process
//! and storage boundaries as [`Snapshot`]s: a JSON object tagged with a `type`
//! field. The embedding application supplies a [`Restorer`] that turns
//! snapshots back into live values.

use crate::error::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A tagged, serializable representation of a state or command value.
///
/// Serialized as `{ "type": kind, ...fields }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Snapshot {
    /// Creates a snapshot with the given type tag and no fields.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Creates a snapshot whose fields are the serialized fields of `value`.
    ///
    /// `value` must serialize to a JSON object.
    pub fn encode<T: Serialize>(kind: impl Into<String>, value: &T) -> CoreResult<Self> {
        match serde_json::to_value(value) {
            Ok(Value::Object(fields)) => Ok(Self {
                kind: kind.into(),
                fields,
            }),
            Ok(other) => Err(CoreError::malformed_snapshot(format!(
                "expected an object, got {other}"
            ))),
            Err(e) => Err(CoreError::malformed_snapshot(e.to_string())),
        }
    }

    /// Decodes the fields of this snapshot into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> CoreResult<T> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| CoreError::malformed_snapshot(format!("{}: {e}", self.kind)))
    }

    /// Returns the type tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the untagged fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Fails with [`CoreError::UnsupportedType`] unless the tag is `kind`.
    pub fn expect_kind(&self, kind: &str) -> CoreResult<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(CoreError::unsupported_type(&self.kind))
        }
    }

    /// Returns the tagged JSON value used for hashing and transmission.
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("type".into(), Value::String(self.kind.clone()));
        Value::Object(object)
    }
}

/// A value that can describe itself as a [`Snapshot`].
pub trait Memento {
    /// Returns the canonical snapshot of this value.
    fn snapshot(&self) -> Snapshot;
}

/// Application state the core can carry through commits.
///
/// Blanket-implemented for every cloneable, thread-safe [`Memento`].
pub trait State: Memento + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> State for T where T: Memento + Clone + fmt::Debug + Send + Sync + 'static {}

/// A pure state transition recorded in a command commit.
///
/// `apply` must be deterministic: replaying the same command on the same
/// state always yields the same result.
pub trait Command<S>: Memento + fmt::Debug + Send + Sync {
    /// Computes the state after this command.
    fn apply(&self, state: &S) -> S;
}

/// Shared handle to a command.
pub type CommandRef<S> = Arc<dyn Command<S>>;

/// Rehydrates state and command snapshots.
///
/// Implementations dispatch on [`Snapshot::kind`] and must fail with
/// [`CoreError::UnsupportedType`] for tags they do not recognize.
pub trait Restorer<S>: Send + Sync {
    /// Restores a state value.
    fn restore_state(&self, snapshot: &Snapshot) -> CoreResult<S>;

    /// Restores a command.
    fn restore_command(&self, snapshot: &Snapshot) -> CoreResult<CommandRef<S>>;
}

impl<S, R: Restorer<S> + ?Sized> Restorer<S> for Arc<R> {
    fn restore_state(&self, snapshot: &Snapshot) -> CoreResult<S> {
        (**self).restore_state(snapshot)
    }

    fn restore_command(&self, snapshot: &Snapshot) -> CoreResult<CommandRef<S>> {
        (**self).restore_command(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn serializes_with_type_tag() {
        let snapshot = Snapshot::new("Set-Command").with("value", 6);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json, json!({ "type": "Set-Command", "value": 6 }));

        let back: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.to_value(), json!({ "type": "Set-Command", "value": 6 }));
    }

    #[test]
    fn encode_and_decode_struct_fields() {
        let snapshot = Snapshot::encode("Point", &Point { x: 1, y: 2 }).unwrap();
        assert_eq!(snapshot.kind(), "Point");
        assert_eq!(snapshot.get("x"), Some(&json!(1)));
        assert_eq!(snapshot.decode::<Point>().unwrap(), Point { x: 1, y: 2 });
    }

    #[test]
    fn encode_rejects_non_objects() {
        let err = Snapshot::encode("Number", &5).unwrap_err();
        assert!(matches!(err, CoreError::MalformedSnapshot { .. }));
    }

    #[test]
    fn decode_reports_missing_fields() {
        let err = Snapshot::new("Point").with("x", 1).decode::<Point>().unwrap_err();
        assert!(matches!(err, CoreError::MalformedSnapshot { .. }));
    }

    #[test]
    fn expect_kind() {
        let snapshot = Snapshot::new("Add-Command");
        assert!(snapshot.expect_kind("Add-Command").is_ok());
        assert_eq!(
            snapshot.expect_kind("Set-Command"),
            Err(CoreError::UnsupportedType {
                kind: "Add-Command".into()
            })
        );
    }
}
