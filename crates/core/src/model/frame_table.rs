use serde::{Deserialize, Serialize};

use super::{MethodLookup, StackFrame};

/// Index of the synthetic root frame in every decoded profile.
pub const TREE_ROOT: usize = 0;

/// The decoded frames of one profile, plus its method lookup table.
///
/// Built once per fetched profile and never mutated afterwards; views
/// borrow it for every aggregation and render pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameTable {
    all_nodes: Vec<StackFrame>,
    method_lookup: MethodLookup,
    /// Frames with `on_cpu > 0`, heaviest first.
    terminal_nodes: Vec<usize>,
}

impl FrameTable {
    /// Assemble a table from already linked frames. `terminal_nodes` is
    /// re-sorted by `on_cpu` descending; frames with equal counts keep the
    /// order they were given in.
    pub fn new(
        all_nodes: Vec<StackFrame>,
        method_lookup: MethodLookup,
        mut terminal_nodes: Vec<usize>,
    ) -> Self {
        terminal_nodes.sort_by(|a, b| {
            let a = all_nodes.get(*a).map_or(0, |f| f.on_cpu);
            let b = all_nodes.get(*b).map_or(0, |f| f.on_cpu);
            b.cmp(&a)
        });
        Self {
            all_nodes,
            method_lookup,
            terminal_nodes,
        }
    }

    pub fn frame(&self, index: usize) -> Option<&StackFrame> {
        self.all_nodes.get(index)
    }

    pub fn all_nodes(&self) -> &[StackFrame] {
        &self.all_nodes
    }

    pub fn tree_root(&self) -> usize {
        TREE_ROOT
    }

    pub fn root(&self) -> Option<&StackFrame> {
        self.frame(TREE_ROOT)
    }

    pub fn method_lookup(&self) -> &MethodLookup {
        &self.method_lookup
    }

    pub fn terminal_nodes(&self) -> &[usize] {
        &self.terminal_nodes
    }

    /// Samples covered by the whole tree: the synthetic root's on-stack count.
    pub fn total_on_stack(&self) -> u64 {
        self.root().map_or(0, |r| r.on_stack)
    }

    /// Total on-CPU samples across every terminal frame. Saturates rather
    /// than wrapping on absurd counts.
    pub fn total_on_cpu(&self) -> u64 {
        self.terminal_nodes
            .iter()
            .filter_map(|&i| self.frame(i))
            .fold(0u64, |acc, f| acc.saturating_add(f.on_cpu))
    }

    /// Direct children of the given frame.
    pub fn children(&self, index: usize) -> &[usize] {
        self.frame(index).map_or(&[], |f| f.children.as_slice())
    }

    pub fn len(&self) -> usize {
        self.all_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_nodes.is_empty()
    }
}
