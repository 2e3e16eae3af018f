//! Property tests over generated edit histories.

use proptest::prelude::*;
use syncify_core::{
    ancestry, restore_commit, topological_order, Workspace, WorkspaceManipulator,
};
use syncify_testkit::prelude::*;

fn run_edits(initial: TestState, edits: &[Edit]) -> (Workspace<TestState>, Vec<f64>) {
    let mut m = WorkspaceManipulator::new(Workspace::make_new(initial));
    let mut values = Vec::with_capacity(edits.len());

    for edit in edits {
        m = match edit {
            Edit::Apply(command) => m.apply(command.into_ref()).unwrap(),
            Edit::Undo if m.can_undo() => m.undo().unwrap(),
            Edit::Redo if m.can_redo() => m.redo().unwrap(),
            _ => m,
        };
        values.push(main_state(m.workspace()).value());
    }

    (m.into_workspace(), values)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_and_redo_follow_the_stack_model(
        initial in test_state_strategy(),
        edits in edit_sequence_strategy(24),
    ) {
        let (_, values) = run_edits(initial.clone(), &edits);
        prop_assert_eq!(values, model_values(initial, &edits));
    }

    #[test]
    fn snapshots_restore_to_identical_commits(
        initial in test_state_strategy(),
        edits in edit_sequence_strategy(16),
    ) {
        let (ws, _) = run_edits(initial, &edits);

        let mut restored = Vec::new();
        for commit in ws.commits() {
            let copy = restore_commit(&commit.snapshot(), &TestRestorer).unwrap();
            prop_assert_eq!(copy.hash(), commit.hash());
            restored.push(copy);
        }

        // Rebuilding from restored commits reproduces every state.
        let rebuilt = Workspace::make_empty()
            .add_commits(topological_order(restored))
            .unwrap()
            .set_branches(ws.branches().clone())
            .unwrap();
        prop_assert_eq!(main_state(&rebuilt), main_state(&ws));
    }

    #[test]
    fn ancestry_is_closed_under_parents(
        edits in edit_sequence_strategy(16),
    ) {
        let (ws, _) = run_edits(TestState(BASE_VALUE), &edits);
        let head = main_head(&ws);
        let ancestors = ancestry(&ws, &head).unwrap();

        prop_assert!(ancestors.contains(&head));
        prop_assert!(ancestors.contains(ws.initial_hash().unwrap()));
        for hash in &ancestors {
            for parent in ws.commit(hash).unwrap().parents() {
                prop_assert!(ancestors.contains(parent));
            }
        }
        // A single linear session reaches every commit it made.
        prop_assert_eq!(ancestors.len(), ws.len());
    }

    #[test]
    fn hashes_are_deterministic(
        commands in command_sequence_strategy(12),
    ) {
        let first = apply_all(base_workspace(), &commands);
        let second = apply_all(base_workspace(), &commands);
        prop_assert_eq!(main_head(&first), main_head(&second));
    }
}
