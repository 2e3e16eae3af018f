//! Benchmark utilities.

use rand::Rng;
use syncify_core::{Workspace, WorkspaceManipulator};
use syncify_testkit::{base_workspace, TestCommand, TestState};

/// Generate `count` random arithmetic commands.
pub fn random_commands(count: usize) -> Vec<TestCommand> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| match rng.gen_range(0..4) {
            0 => TestCommand::Set(f64::from(rng.gen_range(-100i32..100))),
            1 => TestCommand::Add(f64::from(rng.gen_range(-10i32..10))),
            2 => TestCommand::Subtract(f64::from(rng.gen_range(-10i32..10))),
            _ => TestCommand::Multiply(2.0),
        })
        .collect()
}

/// A linear history of `len` commands on `main`.
pub fn linear_history(len: usize) -> Workspace<TestState> {
    random_commands(len)
        .into_iter()
        .try_fold(WorkspaceManipulator::new(base_workspace()), |m, c| {
            m.apply(c.into_ref())
        })
        .map(WorkspaceManipulator::into_workspace)
        .unwrap_or_else(|e| panic!("benchmark history: {e}"))
}

/// A history of `len` commands where every other step is undone and then
/// redone.
pub fn undo_heavy_history(len: usize) -> Workspace<TestState> {
    let mut m = WorkspaceManipulator::new(base_workspace());
    for (i, command) in random_commands(len).into_iter().enumerate() {
        m = m
            .apply(command.into_ref())
            .unwrap_or_else(|e| panic!("benchmark apply: {e}"));
        if i % 2 == 1 {
            m = m
                .undo()
                .and_then(WorkspaceManipulator::redo)
                .unwrap_or_else(|e| panic!("benchmark undo/redo: {e}"));
        }
    }
    m.into_workspace()
}
