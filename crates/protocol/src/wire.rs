use serde::{Deserialize, Serialize};

/// The payload served by the profiling backend for one aggregated profile.
///
/// ```text
/// {
///   "aggregated_samples": { "frame_nodes": [[method, children, line, [on_stack, on_cpu]], ...] },
///   "method_lookup": ["fully.qualified.Method signature", ...]
/// }
/// ```
///
/// `frame_nodes` is a depth-first pre-order flattening of the sampled
/// call-stack forest. Index 0 is a synthetic root whose children are the
/// real call-tree roots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePayload {
    pub aggregated_samples: AggregatedSamples,
    #[serde(default)]
    pub method_lookup: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSamples {
    #[serde(default)]
    pub frame_nodes: Vec<WireFrameNode>,
}

/// One encoded frame: `[method_index, child_count, line_no, [on_stack, on_cpu]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFrameNode(pub u32, pub u32, pub i32, pub SampleCounts);

/// `[on_stack, on_cpu]` sample counts of an encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts(pub u64, pub u64);

impl WireFrameNode {
    pub fn new(method: u32, child_count: u32, line_no: i32, on_stack: u64, on_cpu: u64) -> Self {
        Self(method, child_count, line_no, SampleCounts(on_stack, on_cpu))
    }

    #[inline]
    pub fn method(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn child_count(&self) -> u32 {
        self.1
    }

    #[inline]
    pub fn line_no(&self) -> i32 {
        self.2
    }

    #[inline]
    pub fn on_stack(&self) -> u64 {
        self.3.0
    }

    #[inline]
    pub fn on_cpu(&self) -> u64 {
        self.3.1
    }
}
