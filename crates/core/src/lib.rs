//! Call-tree reconstruction and incremental tree views for sampled CPU
//! profiles.
//!
//! ```text
//!   wire payload ──▶ parsers ──▶ FrameTable ──▶ aggregate ──▶ TreeView ──▶ TreeRow[]
//!                  (decode)     (immutable)    (de-dupe)     (expand /
//!                                                             collapse /
//!                                                             filter)
//! ```

pub mod model;
pub mod parsers;
pub mod views;

pub use model::{FrameTable, MethodEntry, MethodLookup, ProfileSession, StackFrame};
pub use parsers::{ParseError, parse_profile};
pub use views::{TreeConfig, TreeView};
