use std::collections::HashMap;

use calltrace_protocol::TraversalDirection;
use log::warn;

use crate::model::{FrameTable, StackFrame};

/// A reference to a frame handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRef {
    /// A frame in the table; its count comes from the frame itself.
    Index(usize),
    /// A frame in the table carrying a count attributed by the layer below.
    WithCount(usize, u64),
    /// A frame held by value. Its `parent` and `children` still index the table.
    Inline(StackFrame),
}

impl FrameRef {
    pub fn index(&self) -> usize {
        match self {
            Self::Index(i) | Self::WithCount(i, _) => *i,
            Self::Inline(frame) => frame.index,
        }
    }

    pub fn inherited_count(&self) -> Option<u64> {
        match self {
            Self::WithCount(_, count) => Some(*count),
            Self::Index(_) | Self::Inline(_) => None,
        }
    }

    pub fn resolve<'a>(&'a self, table: &'a FrameTable) -> Option<&'a StackFrame> {
        match self {
            Self::Index(i) | Self::WithCount(i, _) => table.frame(*i),
            Self::Inline(frame) => Some(frame),
        }
    }
}

/// What makes two frames "the same row" in a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub method: usize,
    /// `None` for top-layer hot-methods rows, which group by method alone.
    pub line_no: Option<i32>,
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line_no {
            Some(line) => write!(f, "{}:{}", self.method, line),
            None => write!(f, "{}", self.method),
        }
    }
}

/// One visible row after de-duping a set of sibling frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRow {
    pub key: RowKey,
    /// Line of the first frame absorbed into this row.
    pub line_no: i32,
    pub sample_count: u64,
    pub on_cpu: Option<u64>,
    /// `(frame, count)` for every input frame this row absorbed.
    pub sources: Vec<(usize, u64)>,
    /// Input for the next aggregation when this row is expanded.
    pub next: Vec<FrameRef>,
    pub is_top_layer: bool,
}

impl AggregatedRow {
    fn empty(key: RowKey, line_no: i32, is_top_layer: bool) -> Self {
        Self {
            key,
            line_no,
            sample_count: 0,
            on_cpu: None,
            sources: Vec::new(),
            next: Vec::new(),
            is_top_layer,
        }
    }

    pub fn method(&self) -> usize {
        self.key.method
    }

    pub fn has_children(&self) -> bool {
        !self.next.is_empty()
    }
}

/// The first layer of a view: terminal frames for hot methods, the real
/// call-tree roots for call trees.
pub fn top_layer_refs(table: &FrameTable, direction: TraversalDirection) -> Vec<FrameRef> {
    match direction {
        TraversalDirection::HotMethods => table
            .terminal_nodes()
            .iter()
            .map(|&i| FrameRef::Index(i))
            .collect(),
        TraversalDirection::CallTree => table
            .children(table.tree_root())
            .iter()
            .map(|&i| FrameRef::Index(i))
            .collect(),
    }
}

/// De-dupe a set of sibling frame references into display rows.
///
/// Rows come back heaviest first; equal counts keep the order in which
/// their keys were first seen, so the same input always yields the same
/// ordering.
pub fn aggregate(
    table: &FrameTable,
    refs: &[FrameRef],
    direction: TraversalDirection,
    top_layer: bool,
) -> Vec<AggregatedRow> {
    let mut rows = match direction {
        TraversalDirection::CallTree => call_tree_rows(table, refs, top_layer),
        TraversalDirection::HotMethods => hot_method_rows(table, refs, top_layer),
    };
    rows.sort_by(|a, b| b.sample_count.cmp(&a.sample_count));
    rows
}

/// Call-tree children are already unique within their parent, so each
/// frame becomes its own row.
fn call_tree_rows(table: &FrameTable, refs: &[FrameRef], top_layer: bool) -> Vec<AggregatedRow> {
    let mut rows = Vec::with_capacity(refs.len());
    for frame_ref in refs {
        let Some(frame) = frame_ref.resolve(table) else {
            warn!("call tree: skipping unknown frame {}", frame_ref.index());
            continue;
        };
        let count = frame_ref.inherited_count().unwrap_or(frame.on_stack);
        let key = RowKey {
            method: frame.method,
            line_no: Some(frame.line_no),
        };
        let mut row = AggregatedRow::empty(key, frame.line_no, top_layer);
        row.sample_count = count;
        row.on_cpu = Some(frame.on_cpu);
        row.sources.push((frame.index, count));
        row.next = frame.children.iter().map(|&c| FrameRef::Index(c)).collect();
        rows.push(row);
    }
    rows
}

/// Climb one layer toward the roots, summing the samples attributed to
/// each distinct caller.
fn hot_method_rows(table: &FrameTable, refs: &[FrameRef], top_layer: bool) -> Vec<AggregatedRow> {
    let mut rows: Vec<AggregatedRow> = Vec::new();
    let mut slots: HashMap<RowKey, usize> = HashMap::new();
    // (row slot, caller frame) -> position in that row's `next`.
    let mut callers: HashMap<(usize, usize), usize> = HashMap::new();

    for frame_ref in refs {
        let Some(frame) = frame_ref.resolve(table) else {
            warn!("hot methods: skipping unknown frame {}", frame_ref.index());
            continue;
        };
        // The synthetic root stands for "no more callers".
        let Some(parent) = frame.parent else {
            continue;
        };
        let count = frame_ref.inherited_count().unwrap_or(frame.on_cpu);
        let key = RowKey {
            method: frame.method,
            line_no: (!top_layer).then_some(frame.line_no),
        };

        let slot = *slots.entry(key).or_insert_with(|| {
            rows.push(AggregatedRow::empty(key, frame.line_no, top_layer));
            rows.len() - 1
        });
        let row = &mut rows[slot];
        row.sample_count = row.sample_count.saturating_add(count);
        if top_layer {
            row.on_cpu = Some(row.on_cpu.unwrap_or(0).saturating_add(frame.on_cpu));
        }
        row.sources.push((frame.index, count));

        let caller_is_real = table.frame(parent).is_some_and(|p| p.parent.is_some());
        if !caller_is_real {
            continue;
        }
        match callers.get(&(slot, parent)) {
            Some(&pos) => {
                if let FrameRef::WithCount(_, total) = &mut row.next[pos] {
                    *total = total.saturating_add(count);
                }
            }
            None => {
                callers.insert((slot, parent), row.next.len());
                row.next.push(FrameRef::WithCount(parent, count));
            }
        }
    }

    rows
}
