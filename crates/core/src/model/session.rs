use calltrace_protocol::{TraversalDirection, TreeRow};
use log::debug;

use crate::model::FrameTable;
use crate::parsers::{ParseError, parse_profile};
use crate::views::{TreeConfig, TreeView};

/// One loaded profile with a hot-methods view and a call-tree view over it.
///
/// The frame table is immutable for the lifetime of the session. Loading a
/// newer profile means building a new session; the old one is simply
/// dropped.
#[derive(Debug, Clone)]
pub struct ProfileSession {
    table: FrameTable,
    label: String,
    hot_methods: TreeView,
    call_tree: TreeView,
}

impl ProfileSession {
    /// Wrap an already decoded table and materialize both views.
    pub fn new(table: FrameTable, label: impl Into<String>, config: TreeConfig) -> Self {
        let mut hot_methods = TreeView::new(TraversalDirection::HotMethods, config);
        let mut call_tree = TreeView::new(TraversalDirection::CallTree, config);
        hot_methods.materialize(&table);
        call_tree.materialize(&table);
        Self {
            table,
            label: label.into(),
            hot_methods,
            call_tree,
        }
    }

    /// Parse a backend payload into a fresh session.
    pub fn load(
        data: &[u8],
        label: impl Into<String>,
        config: TreeConfig,
    ) -> Result<Self, ParseError> {
        let label = label.into();
        let table = parse_profile(data)?;
        debug!("loaded profile {label:?}: {} frames", table.len());
        Ok(Self::new(table, label, config))
    }

    pub fn table(&self) -> &FrameTable {
        &self.table
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn view(&self, direction: TraversalDirection) -> &TreeView {
        match direction {
            TraversalDirection::HotMethods => &self.hot_methods,
            TraversalDirection::CallTree => &self.call_tree,
        }
    }

    /// The table alongside a mutable view, for driving view operations
    /// directly.
    pub fn view_mut(&mut self, direction: TraversalDirection) -> (&FrameTable, &mut TreeView) {
        let view = match direction {
            TraversalDirection::HotMethods => &mut self.hot_methods,
            TraversalDirection::CallTree => &mut self.call_tree,
        };
        (&self.table, view)
    }

    /// Returns `false` when `unique_id` is not currently visible.
    pub fn toggle(&mut self, direction: TraversalDirection, unique_id: &str) -> bool {
        let (table, view) = self.view_mut(direction);
        view.toggle_id(table, unique_id)
    }

    pub fn set_filter(&mut self, direction: TraversalDirection, text: &str) {
        let (table, view) = self.view_mut(direction);
        view.set_filter(table, text);
    }

    pub fn highlight(&mut self, direction: TraversalDirection, unique_id: &str) {
        self.view_mut(direction).1.highlight(unique_id);
    }

    pub fn rows(&self, direction: TraversalDirection) -> Vec<TreeRow> {
        self.view(direction).rows(&self.table)
    }
}
