pub mod frame;
pub mod frame_table;
pub mod method_lookup;
pub mod session;

pub use frame::StackFrame;
pub use frame_table::{FrameTable, TREE_ROOT};
pub use method_lookup::{MethodEntry, MethodLookup};
pub use session::ProfileSession;
