//! A numeric state model with arithmetic commands.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use syncify_core::{Command, CommandRef, CoreError, CoreResult, Memento, Restorer, Snapshot};

/// Type tag of a [`TestState`] snapshot.
pub const TEST_STATE_TYPE: &str = "Test-State";

/// A single number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestState(pub f64);

impl TestState {
    /// Returns the value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Memento for TestState {
    fn snapshot(&self) -> Snapshot {
        Snapshot::new(TEST_STATE_TYPE).with("value", self.0)
    }
}

/// Arithmetic commands over [`TestState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestCommand {
    /// Replaces the value.
    Set(f64),
    /// Adds to the value.
    Add(f64),
    /// Subtracts from the value.
    Subtract(f64),
    /// Multiplies the value.
    Multiply(f64),
    /// Divides the value.
    Divide(f64),
}

impl TestCommand {
    /// Returns the snapshot type tag.
    pub fn tag(&self) -> &'static str {
        match self {
            TestCommand::Set(_) => "Set-Command",
            TestCommand::Add(_) => "Add-Command",
            TestCommand::Subtract(_) => "Subtract-Command",
            TestCommand::Multiply(_) => "Multiply-Command",
            TestCommand::Divide(_) => "Divide-Command",
        }
    }

    fn operand(&self) -> f64 {
        match *self {
            TestCommand::Set(v)
            | TestCommand::Add(v)
            | TestCommand::Subtract(v)
            | TestCommand::Multiply(v)
            | TestCommand::Divide(v) => v,
        }
    }

    /// Wraps the command in a shared handle.
    pub fn into_ref(self) -> CommandRef<TestState> {
        Arc::new(self)
    }
}

impl Memento for TestCommand {
    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.tag()).with("value", self.operand())
    }
}

impl Command<TestState> for TestCommand {
    fn apply(&self, state: &TestState) -> TestState {
        TestState(match *self {
            TestCommand::Set(v) => v,
            TestCommand::Add(v) => state.0 + v,
            TestCommand::Subtract(v) => state.0 - v,
            TestCommand::Multiply(v) => state.0 * v,
            TestCommand::Divide(v) => state.0 / v,
        })
    }
}

/// Restores [`TestState`] and [`TestCommand`] snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestRestorer;

fn operand(snapshot: &Snapshot) -> CoreResult<f64> {
    snapshot
        .get("value")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| CoreError::malformed_snapshot(format!("{} has no numeric value", snapshot.kind())))
}

impl Restorer<TestState> for TestRestorer {
    fn restore_state(&self, snapshot: &Snapshot) -> CoreResult<TestState> {
        snapshot.expect_kind(TEST_STATE_TYPE)?;
        Ok(TestState(operand(snapshot)?))
    }

    fn restore_command(&self, snapshot: &Snapshot) -> CoreResult<CommandRef<TestState>> {
        let value = || operand(snapshot);
        let command = match snapshot.kind() {
            "Set-Command" => TestCommand::Set(value()?),
            "Add-Command" => TestCommand::Add(value()?),
            "Subtract-Command" => TestCommand::Subtract(value()?),
            "Multiply-Command" => TestCommand::Multiply(value()?),
            "Divide-Command" => TestCommand::Divide(value()?),
            other => return Err(CoreError::unsupported_type(other)),
        };
        Ok(command.into_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_apply() {
        let state = TestState(6.0);
        assert_eq!(TestCommand::Set(1.0).apply(&state), TestState(1.0));
        assert_eq!(TestCommand::Add(2.0).apply(&state), TestState(8.0));
        assert_eq!(TestCommand::Subtract(2.0).apply(&state), TestState(4.0));
        assert_eq!(TestCommand::Multiply(2.0).apply(&state), TestState(12.0));
        assert_eq!(TestCommand::Divide(2.0).apply(&state), TestState(3.0));
    }

    #[test]
    fn command_restores_from_snapshot() {
        let command = TestCommand::Divide(2.0);
        let restored = TestRestorer.restore_command(&command.snapshot()).unwrap();
        assert_eq!(restored.apply(&TestState(6.0)), TestState(3.0));
    }

    #[test]
    fn state_restores_from_snapshot() {
        let snapshot = TestState(5.0).snapshot();
        assert_eq!(snapshot.kind(), TEST_STATE_TYPE);
        assert_eq!(TestRestorer.restore_state(&snapshot).unwrap(), TestState(5.0));
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let err = TestRestorer
            .restore_command(&Snapshot::new("Modulo-Command").with("value", 2.0))
            .unwrap_err();
        assert_eq!(err, CoreError::unsupported_type("Modulo-Command"));

        let err = TestRestorer
            .restore_state(&Snapshot::new("Other-State"))
            .unwrap_err();
        assert_eq!(err, CoreError::unsupported_type("Other-State"));
    }

    #[test]
    fn missing_operand_is_malformed() {
        let err = TestRestorer
            .restore_command(&Snapshot::new("Add-Command"))
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedSnapshot { .. }));
    }
}
