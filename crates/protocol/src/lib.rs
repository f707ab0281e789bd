pub mod rows;
pub mod wire;

pub use rows::{TraversalDirection, TreeRow};
pub use wire::{AggregatedSamples, ProfilePayload, SampleCounts, WireFrameNode};
