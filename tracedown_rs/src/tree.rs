//! Action tree reconstruction.
//!
//! Actions arrive flat, each carrying an optional `parentId`. The tree puts
//! them back under a synthetic root (unknown parents re-root there) and sorts
//! every sibling list by start time. A separate step-to-snapshot map lets a
//! user-level test step inherit the snapshots of the API action it caused.

use std::collections::HashMap;

use crate::types::{Action, Trace};

/// Parent/child structure over `trace.actions`, addressed by index.
pub struct ActionTree {
    /// Indices of top-level actions, sorted by start time.
    pub roots: Vec<usize>,
    /// `children[i]` are the child indices of `actions[i]`, sorted by start time.
    pub children: Vec<Vec<usize>>,
}

impl ActionTree {
    pub fn build(actions: &[Action]) -> Self {
        let mut by_call_id = HashMap::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            // Later duplicates win, matching ingestion's overwrite semantics.
            by_call_id.insert(action.call_id.as_str(), index);
        }

        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); actions.len()];
        for (index, action) in actions.iter().enumerate() {
            let parent = action
                .parent_id
                .as_deref()
                .and_then(|id| by_call_id.get(id).copied())
                .filter(|&parent| parent != index);
            match parent {
                Some(parent) => children[parent].push(index),
                None => roots.push(index),
            }
        }

        let by_start = |a: &usize, b: &usize| {
            actions[*a].start_time.total_cmp(&actions[*b].start_time)
        };
        roots.sort_by(by_start);
        for list in &mut children {
            list.sort_by(by_start);
        }
        Self { roots, children }
    }

    /// Depth-first walk over test-step actions only, yielding `(index, depth)`.
    pub fn test_steps<'a>(&'a self, actions: &'a [Action]) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for &root in &self.roots {
            self.collect_test_steps(actions, root, 0, &mut out);
        }
        out
    }

    fn collect_test_steps(
        &self,
        actions: &[Action],
        index: usize,
        depth: usize,
        out: &mut Vec<(usize, usize)>,
    ) {
        let is_step = actions[index].is_test_step();
        let child_depth = if is_step {
            out.push((index, depth));
            depth + 1
        } else {
            // API-level actions are transparent in the timeline: their test
            // descendants surface at the current depth.
            depth
        };
        for &child in &self.children[index] {
            self.collect_test_steps(actions, child, child_depth, out);
        }
    }
}

/// Snapshot names an API action recorded on behalf of a test step.
#[derive(Debug, Default, Clone)]
pub struct StepSnapshots {
    pub before: Option<String>,
    pub after: Option<String>,
}

/// Map from `stepId` to the snapshots of the API actions that reference it.
///
/// Only non-test actions contribute; the first action to fill a slot wins so
/// a step inherits its first child's snapshots.
pub fn step_snapshot_map(trace: &Trace) -> HashMap<String, StepSnapshots> {
    let mut map: HashMap<String, StepSnapshots> = HashMap::new();
    for action in &trace.actions {
        if action.is_test_step() {
            continue;
        }
        let Some(step_id) = &action.step_id else {
            continue;
        };
        if action.before_snapshot.is_none() && action.after_snapshot.is_none() {
            continue;
        }
        let entry = map.entry(step_id.clone()).or_default();
        if entry.before.is_none() {
            entry.before = action.before_snapshot.clone();
        }
        if entry.after.is_none() {
            entry.after = action.after_snapshot.clone();
        }
    }
    map
}
