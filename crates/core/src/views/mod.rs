pub mod aggregate;
pub mod display;
pub mod tree;

pub use aggregate::{AggregatedRow, FrameRef, RowKey, aggregate, top_layer_refs};
pub use display::{denominator, display_name, method_label, percentage};
pub use tree::{NameFilter, RenderEntry, TreeConfig, TreeView};
