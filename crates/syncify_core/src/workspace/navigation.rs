//! Graph walks over a workspace.

use super::Workspace;
use crate::commit::Commit;
use crate::error::CoreResult;
use crate::hash::CommitHash;
use std::collections::{HashMap, HashSet};

/// Returns every hash reachable from `start` by following parent edges,
/// `start` included.
pub fn ancestry<S>(workspace: &Workspace<S>, start: &CommitHash) -> CoreResult<HashSet<CommitHash>> {
    ancestry_until(workspace, start, |_| false)
}

/// Like [`ancestry`], but prunes the walk at every commit for which `stop`
/// returns true. A matched commit is excluded and its ancestors are not
/// visited through it.
pub fn ancestry_until<S, F>(
    workspace: &Workspace<S>,
    start: &CommitHash,
    stop: F,
) -> CoreResult<HashSet<CommitHash>>
where
    F: Fn(&Commit<S>) -> bool,
{
    let mut visited = HashSet::new();
    let mut pruned = HashSet::new();
    let mut stack = vec![start.clone()];

    while let Some(hash) = stack.pop() {
        if visited.contains(&hash) || pruned.contains(&hash) {
            continue;
        }

        let commit = workspace.commit(&hash)?;
        if stop(commit) {
            pruned.insert(hash);
            continue;
        }

        stack.extend(commit.parents().cloned());
        visited.insert(hash);
    }

    Ok(visited)
}

/// Returns the replay chain from `head` back to the initial commit, head
/// first.
///
/// Follows [`Commit::replay_parent`], so a merge continues into its
/// selected side only.
pub fn replay_chain<'a, S>(workspace: &'a Workspace<S>, head: &CommitHash) -> CoreResult<Vec<&'a Commit<S>>> {
    let mut chain = Vec::new();
    let mut current = Some(head.clone());

    while let Some(hash) = current {
        let commit = workspace.commit(&hash)?;
        current = commit.replay_parent().cloned();
        chain.push(commit);
    }

    Ok(chain)
}

/// Orders a batch of commits so every parent inside the batch comes before
/// its children. Duplicate hashes are dropped.
///
/// Ties keep the input order, so an already ordered batch is returned
/// unchanged.
pub fn topological_order<S>(commits: Vec<Commit<S>>) -> Vec<Commit<S>> {
    let order: Vec<CommitHash> = commits.iter().map(|c| c.hash().clone()).collect();
    let mut pending: HashMap<CommitHash, Commit<S>> = commits
        .into_iter()
        .map(|c| (c.hash().clone(), c))
        .collect();
    let mut sorted = Vec::with_capacity(pending.len());

    for root in order {
        // Iterative post-order walk restricted to the batch.
        let mut stack = vec![(root, false)];
        while let Some((hash, expanded)) = stack.pop() {
            if expanded {
                if let Some(commit) = pending.remove(&hash) {
                    sorted.push(commit);
                }
                continue;
            }

            let Some(commit) = pending.get(&hash) else {
                continue;
            };
            let parents: Vec<CommitHash> = commit
                .parents()
                .filter(|p| pending.contains_key(*p))
                .cloned()
                .collect();
            stack.push((hash, true));
            stack.extend(parents.into_iter().rev().map(|p| (p, false)));
        }
    }

    sorted
}
