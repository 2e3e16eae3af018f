//! A tiny state model for unit tests inside this crate.

use crate::error::{CoreError, CoreResult};
use crate::snapshot::{Command, CommandRef, Memento, Restorer, Snapshot};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Counter(pub i64);

impl Memento for Counter {
    fn snapshot(&self) -> Snapshot {
        Snapshot::new("Counter").with("value", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum CounterCommand {
    Set(i64),
    Add(i64),
}

impl Memento for CounterCommand {
    fn snapshot(&self) -> Snapshot {
        match self {
            CounterCommand::Set(v) => Snapshot::new("Set").with("value", *v),
            CounterCommand::Add(v) => Snapshot::new("Add").with("value", *v),
        }
    }
}

impl Command<Counter> for CounterCommand {
    fn apply(&self, state: &Counter) -> Counter {
        match self {
            CounterCommand::Set(v) => Counter(*v),
            CounterCommand::Add(v) => Counter(state.0 + v),
        }
    }
}

pub(crate) struct CounterRestorer;

fn value(snapshot: &Snapshot) -> CoreResult<i64> {
    snapshot
        .get("value")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| CoreError::malformed_snapshot("missing value"))
}

impl Restorer<Counter> for CounterRestorer {
    fn restore_state(&self, snapshot: &Snapshot) -> CoreResult<Counter> {
        snapshot.expect_kind("Counter")?;
        Ok(Counter(value(snapshot)?))
    }

    fn restore_command(&self, snapshot: &Snapshot) -> CoreResult<CommandRef<Counter>> {
        match snapshot.kind() {
            "Set" => Ok(Arc::new(CounterCommand::Set(value(snapshot)?))),
            "Add" => Ok(Arc::new(CounterCommand::Add(value(snapshot)?))),
            other => Err(CoreError::unsupported_type(other)),
        }
    }
}
