use calltrace_protocol::{ProfilePayload, WireFrameNode};
use log::{debug, warn};
use thiserror::Error;

use crate::model::{FrameTable, MethodLookup, StackFrame};

/// The encoded frame array does not describe one consistent tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameNodesError {
    #[error("frame_nodes is empty; expected a synthetic root at index 0")]
    Empty,
    #[error("frame {parent} declares {expected} children but the array ends after {found}")]
    Truncated {
        parent: usize,
        expected: usize,
        found: usize,
    },
    #[error("root subtree covers {consumed} frames but the array holds {total}")]
    TrailingFrames { consumed: usize, total: usize },
}

/// A frame on the decode stack, still waiting for some of its children.
struct Pending {
    index: usize,
    remaining: usize,
}

/// Decode a wire payload into a [`FrameTable`].
pub fn build_frame_table(payload: &ProfilePayload) -> Result<FrameTable, FrameNodesError> {
    let lookup = MethodLookup::from_wire(&payload.method_lookup);
    decode_frame_nodes(&payload.aggregated_samples.frame_nodes, lookup)
}

/// Rebuild the frame forest from its pre-order encoding.
///
/// Every node's children follow it immediately, each child subtree taking a
/// contiguous block. Decoding walks the array once with an explicit stack so
/// arbitrarily deep stacks cannot overflow the call stack. Any inconsistency
/// fails the whole decode.
pub fn decode_frame_nodes(
    nodes: &[WireFrameNode],
    method_lookup: MethodLookup,
) -> Result<FrameTable, FrameNodesError> {
    let Some(root) = nodes.first() else {
        return Err(FrameNodesError::Empty);
    };

    let mut frames: Vec<StackFrame> = Vec::with_capacity(nodes.len());
    let mut terminal_nodes = Vec::new();

    frames.push(decode_one(0, root, None));
    let mut stack = vec![Pending {
        index: 0,
        remaining: root.child_count() as usize,
    }];
    let mut cursor = 1;

    while let Some(top) = stack.last_mut() {
        if top.remaining == 0 {
            stack.pop();
            continue;
        }
        top.remaining -= 1;
        let parent = top.index;

        let Some(wire) = nodes.get(cursor) else {
            let expected = frames[parent].child_count;
            return Err(FrameNodesError::Truncated {
                parent,
                expected,
                found: frames[parent].children.len(),
            });
        };

        let frame = decode_one(cursor, wire, Some(parent));
        frames[parent].children.push(cursor);
        stack.push(Pending {
            index: cursor,
            remaining: frame.child_count,
        });
        frames.push(frame);
        cursor += 1;
    }

    if cursor != nodes.len() {
        return Err(FrameNodesError::TrailingFrames {
            consumed: cursor,
            total: nodes.len(),
        });
    }

    for frame in &frames {
        if frame.on_cpu > frame.on_stack {
            warn!(
                "frame {} has on_cpu {} above on_stack {}",
                frame.index, frame.on_cpu, frame.on_stack
            );
        }
        if frame.is_terminal() {
            terminal_nodes.push(frame.index);
        }
    }

    debug!(
        "decoded {} frames, {} terminal, {} methods",
        frames.len(),
        terminal_nodes.len(),
        method_lookup.len()
    );

    Ok(FrameTable::new(frames, method_lookup, terminal_nodes))
}

fn decode_one(index: usize, wire: &WireFrameNode, parent: Option<usize>) -> StackFrame {
    let child_count = wire.child_count() as usize;
    StackFrame {
        index,
        method: wire.method() as usize,
        line_no: wire.line_no(),
        child_count,
        on_stack: wire.on_stack(),
        on_cpu: wire.on_cpu(),
        parent,
        children: Vec::with_capacity(child_count.min(64)),
    }
}
