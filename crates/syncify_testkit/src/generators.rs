//! Property-based test generators using proptest.
//!
//! Operands are small integers so replayed arithmetic stays exact and
//! finite. Divisors are never zero.

use crate::test_state::{TestCommand, TestState};
use proptest::prelude::*;

/// Strategy for initial states.
pub fn test_state_strategy() -> impl Strategy<Value = TestState> {
    (-100i32..100).prop_map(|v| TestState(f64::from(v)))
}

/// Strategy for a single arithmetic command.
pub fn test_command_strategy() -> impl Strategy<Value = TestCommand> {
    let operand = -50i32..50;
    prop_oneof![
        operand.clone().prop_map(|v| TestCommand::Set(f64::from(v))),
        operand.clone().prop_map(|v| TestCommand::Add(f64::from(v))),
        operand.prop_map(|v| TestCommand::Subtract(f64::from(v))),
        prop::sample::select(vec![-2.0, 2.0, 4.0]).prop_map(TestCommand::Multiply),
        prop::sample::select(vec![-2.0, 2.0, 4.0]).prop_map(TestCommand::Divide),
    ]
}

/// Strategy for a sequence of commands.
pub fn command_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<TestCommand>> {
    prop::collection::vec(test_command_strategy(), 0..=max_len)
}

/// A user action on a branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edit {
    /// Record a command.
    Apply(TestCommand),
    /// Undo the latest undoable edit.
    Undo,
    /// Redo the latest undo.
    Redo,
}

/// Strategy for a session of edits, undos and redos.
pub fn edit_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<Edit>> {
    let edit = prop_oneof![
        3 => test_command_strategy().prop_map(Edit::Apply),
        1 => Just(Edit::Undo),
        1 => Just(Edit::Redo),
    ];
    prop::collection::vec(edit, 0..=max_len)
}

/// Replays `edits` against a plain stack model and returns the expected
/// value after each step. Undo and redo that have nothing to act on leave
/// the value unchanged.
pub fn model_values(initial: TestState, edits: &[Edit]) -> Vec<f64> {
    // `applied` holds every visible edit's resulting value; `undone` holds
    // the values removed by undo, most recent last.
    let mut applied = vec![initial.0];
    let mut undone: Vec<f64> = Vec::new();
    let mut out = Vec::with_capacity(edits.len());

    for edit in edits {
        match edit {
            Edit::Apply(command) => {
                let current = applied.last().copied().unwrap_or(initial.0);
                applied.push(syncify_core::Command::apply(command, &TestState(current)).0);
                undone.clear();
            }
            Edit::Undo => {
                if applied.len() > 1 {
                    if let Some(v) = applied.pop() {
                        undone.push(v);
                    }
                }
            }
            Edit::Redo => {
                if let Some(v) = undone.pop() {
                    applied.push(v);
                }
            }
        }
        out.push(applied.last().copied().unwrap_or(initial.0));
    }

    out
}
