use std::collections::{BTreeSet, HashMap};

use calltrace_protocol::{TraversalDirection, TreeRow};
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::model::FrameTable;
use crate::views::aggregate::{AggregatedRow, aggregate, top_layer_refs};
use crate::views::display::{denominator, display_name, method_label, percentage};

const PATH_SEPARATOR: &str = "->";

/// Indentation steps for nested rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Step used where the tree branches.
    pub major_indent: u32,
    /// Step used along an unbranching chain.
    pub minor_indent: u32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            major_indent: 4,
            minor_indent: 1,
        }
    }
}

/// One materialized row of a [`TreeView`].
#[derive(Debug, Clone)]
pub struct RenderEntry {
    /// Path of ancestor keys plus this row's key; stable across re-renders.
    pub unique_id: String,
    pub row: AggregatedRow,
    pub indent: u32,
    pub depth: u32,
    /// Number of rows in the batch this entry was rendered with.
    pub sibling_count: usize,
    /// Opened without user interaction.
    pub auto_expand: bool,
    rendered_children: usize,
}

impl RenderEntry {
    /// Direct children currently spliced in below this entry.
    pub fn rendered_children(&self) -> usize {
        self.rendered_children
    }
}

/// Case-insensitive match on the method label of top-layer rows.
#[derive(Debug, Clone)]
pub struct NameFilter {
    text: String,
    regex: Regex,
}

impl NameFilter {
    /// Blank text means no filter. Text that is not a valid regex is
    /// matched as a literal substring.
    pub fn new(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        let regex = RegexBuilder::new(text)
            .case_insensitive(true)
            .build()
            .or_else(|_| {
                RegexBuilder::new(&regex::escape(text))
                    .case_insensitive(true)
                    .build()
            });
        match regex {
            Ok(regex) => Some(Self {
                text: text.to_string(),
                regex,
            }),
            Err(e) => {
                warn!("ignoring filter {text:?}: {e}");
                None
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, label: &str) -> bool {
        self.regex.is_match(label)
    }
}

struct ParentContext {
    unique_id: String,
    indent: u32,
    depth: u32,
    sibling_count: usize,
}

/// A lazily materialized, expandable view over one [`FrameTable`].
///
/// Only visible rows exist. Expanding a row aggregates and splices in its
/// children; collapsing removes the contiguous block of its rendered
/// descendants. Open and highlight state are keyed by `unique_id`, so they
/// survive the index shifts caused by splicing.
#[derive(Debug, Clone)]
pub struct TreeView {
    direction: TraversalDirection,
    config: TreeConfig,
    filter: Option<NameFilter>,
    entries: Vec<RenderEntry>,
    opened: HashMap<String, bool>,
    highlighted: BTreeSet<String>,
}

impl TreeView {
    pub fn new(direction: TraversalDirection, config: TreeConfig) -> Self {
        Self {
            direction,
            config,
            filter: None,
            entries: Vec::new(),
            opened: HashMap::new(),
            highlighted: BTreeSet::new(),
        }
    }

    pub fn direction(&self) -> TraversalDirection {
        self.direction
    }

    pub fn config(&self) -> TreeConfig {
        self.config
    }

    pub fn entries(&self) -> &[RenderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filter_text(&self) -> Option<&str> {
        self.filter.as_ref().map(NameFilter::text)
    }

    pub fn is_open(&self, unique_id: &str) -> bool {
        self.opened.get(unique_id).copied().unwrap_or(false)
    }

    pub fn position(&self, unique_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.unique_id == unique_id)
    }

    /// Rebuild the visible rows from the first layer.
    ///
    /// The filter only applies here, to the first layer; rows below a
    /// visible top-layer row are never filtered.
    pub fn materialize(&mut self, table: &FrameTable) {
        let refs = top_layer_refs(table, self.direction);
        let mut rows = aggregate(table, &refs, self.direction, true);
        if let Some(filter) = &self.filter {
            let lookup = table.method_lookup();
            rows.retain(|r| filter.matches(&method_label(lookup, r.method())));
        }

        self.entries = self.make_batch(None, rows);
        let pending: Vec<usize> = (0..self.entries.len())
            .filter(|&i| self.should_descend(i))
            .collect();
        self.expand_pending(table, pending);

        debug!(
            "materialized {} {} rows from {} top-layer refs",
            self.entries.len(),
            self.direction,
            refs.len()
        );
    }

    /// Replace the filter and rebuild from scratch. Rows opened under the
    /// previous filter are forgotten.
    pub fn set_filter(&mut self, table: &FrameTable, text: &str) {
        self.filter = NameFilter::new(text);
        self.opened.clear();
        self.materialize(table);
    }

    /// Open the row at `index` and splice in its children, re-opening any
    /// descendants that were open before. Returns the number of rows added.
    pub fn expand(&mut self, table: &FrameTable, index: usize) -> usize {
        let Some(entry) = self.entries.get(index) else {
            return 0;
        };
        let id = entry.unique_id.clone();
        let already_rendered = entry.rendered_children > 0;
        self.opened.insert(id, true);
        if already_rendered {
            return 0;
        }
        let before = self.entries.len();
        self.expand_pending(table, vec![index]);
        self.entries.len() - before
    }

    /// Close the row at `index` and drop every rendered descendant.
    /// Returns the number of rows removed.
    pub fn collapse(&mut self, index: usize) -> usize {
        let Some(entry) = self.entries.get(index) else {
            return 0;
        };
        self.opened.insert(entry.unique_id.clone(), false);
        let removed = self.descendant_count(index);
        self.entries[index].rendered_children = 0;
        self.entries.drain(index + 1..index + 1 + removed);
        removed
    }

    pub fn toggle(&mut self, table: &FrameTable, index: usize) {
        let Some(entry) = self.entries.get(index) else {
            return;
        };
        if self.is_open(&entry.unique_id) {
            self.collapse(index);
        } else {
            self.expand(table, index);
        }
    }

    pub fn expand_id(&mut self, table: &FrameTable, unique_id: &str) -> usize {
        self.position(unique_id)
            .map_or(0, |index| self.expand(table, index))
    }

    pub fn collapse_id(&mut self, unique_id: &str) -> usize {
        self.position(unique_id)
            .map_or(0, |index| self.collapse(index))
    }

    /// Returns `false` when no visible row has this id.
    pub fn toggle_id(&mut self, table: &FrameTable, unique_id: &str) -> bool {
        match self.position(unique_id) {
            Some(index) => {
                self.toggle(table, index);
                true
            }
            None => false,
        }
    }

    /// Toggle a highlight. Highlighting a row clears any highlights below it.
    pub fn highlight(&mut self, unique_id: &str) {
        if self.highlighted.remove(unique_id) {
            return;
        }
        self.highlighted.retain(|h| !is_descendant(h, unique_id));
        self.highlighted.insert(unique_id.to_string());
    }

    /// True for a highlighted row and for every row on the path to one.
    pub fn is_highlighted(&self, unique_id: &str) -> bool {
        self.highlighted
            .iter()
            .any(|h| h == unique_id || is_descendant(h, unique_id))
    }

    /// Resolve the visible rows for a renderer.
    pub fn rows(&self, table: &FrameTable) -> Vec<TreeRow> {
        let lookup = table.method_lookup();
        let total = denominator(table, self.direction);
        self.entries
            .iter()
            .map(|e| TreeRow {
                id: e.unique_id.clone(),
                label: display_name(lookup, &e.row, self.direction),
                indent: e.indent,
                depth: e.depth,
                samples: e.row.sample_count,
                samples_pct: percentage(e.row.sample_count, total),
                on_cpu: e.row.on_cpu,
                on_cpu_pct: e.row.on_cpu.map(|c| percentage(c, total)),
                opened: self.is_open(&e.unique_id),
                has_children: e.row.has_children(),
                highlighted: self.is_highlighted(&e.unique_id),
            })
            .collect()
    }

    fn should_descend(&self, index: usize) -> bool {
        let entry = &self.entries[index];
        entry.row.has_children() && self.is_open(&entry.unique_id)
    }

    /// Expand every position on `stack`, then any open rows they reveal.
    ///
    /// Positions are handled highest first. Splicing only shifts rows
    /// after the expanded one, so the lower positions still on the stack
    /// stay valid.
    fn expand_pending(&mut self, table: &FrameTable, mut stack: Vec<usize>) {
        while let Some(index) = stack.pop() {
            let children = self.build_children(table, index);
            let first = index + 1;
            self.entries[index].rendered_children = children.len();
            self.entries.splice(first..first, children);
            let added = self.entries[index].rendered_children;
            stack.extend((first..first + added).filter(|&i| self.should_descend(i)));
        }
    }

    fn build_children(&mut self, table: &FrameTable, index: usize) -> Vec<RenderEntry> {
        let (parent, rows) = {
            let entry = &self.entries[index];
            let rows = aggregate(table, &entry.row.next, self.direction, false);
            let parent = ParentContext {
                unique_id: entry.unique_id.clone(),
                indent: entry.indent,
                depth: entry.depth,
                sibling_count: entry.sibling_count,
            };
            (parent, rows)
        };
        self.make_batch(Some(&parent), rows)
    }

    fn make_batch(
        &mut self,
        parent: Option<&ParentContext>,
        rows: Vec<AggregatedRow>,
    ) -> Vec<RenderEntry> {
        let sibling_count = rows.len();
        let (indent, depth) = match parent {
            None => (0, 0),
            Some(p) => {
                let step = if p.sibling_count > 1 || sibling_count > 1 {
                    self.config.major_indent
                } else {
                    self.config.minor_indent
                };
                (p.indent + step, p.depth + 1)
            }
        };

        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut batch = Vec::with_capacity(sibling_count);
        for row in rows {
            let key = row.key.to_string();
            let dupes = seen.entry(key.clone()).or_insert(0);
            let local = if *dupes == 0 {
                key
            } else {
                format!("{key}#{dupes}")
            };
            *dupes += 1;

            let unique_id = match parent {
                None => local,
                Some(p) => format!("{}{PATH_SEPARATOR}{local}", p.unique_id),
            };
            let auto_expand = sibling_count == 1 || !row.has_children();
            if auto_expand {
                self.opened.insert(unique_id.clone(), true);
            }
            batch.push(RenderEntry {
                unique_id,
                row,
                indent,
                depth,
                sibling_count,
                auto_expand,
                rendered_children: 0,
            });
        }
        batch
    }

    /// Rows rendered below `index`, counted over the materialized list only.
    fn descendant_count(&self, index: usize) -> usize {
        let mut remaining = self.entries[index].rendered_children;
        let mut count = 0;
        let mut pos = index + 1;
        while remaining > 0 {
            let Some(entry) = self.entries.get(pos) else {
                break;
            };
            remaining = remaining - 1 + entry.rendered_children;
            count += 1;
            pos += 1;
        }
        count
    }
}

fn is_descendant(candidate: &str, ancestor: &str) -> bool {
    candidate
        .strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR))
}
