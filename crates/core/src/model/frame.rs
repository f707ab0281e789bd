use serde::{Deserialize, Serialize};

/// A single decoded stack frame.
///
/// `index` is the frame's position in the decoded array. Every other
/// structure refers to frames by this index, never by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub index: usize,
    /// Index into the method lookup table.
    pub method: usize,
    /// Line within `method` at which this frame was sampled or made its call.
    pub line_no: i32,
    pub child_count: usize,
    /// Samples in which this frame appears anywhere on the stack.
    pub on_stack: u64,
    /// Samples in which this frame was the executing (topmost) frame.
    pub on_cpu: u64,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl StackFrame {
    /// A frame that was sometimes on CPU. Not necessarily a structural leaf.
    pub fn is_terminal(&self) -> bool {
        self.on_cpu > 0
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
