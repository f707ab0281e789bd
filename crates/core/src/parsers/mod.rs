pub mod frame_nodes;

use calltrace_protocol::ProfilePayload;
use thiserror::Error;

use crate::model::FrameTable;

pub use frame_nodes::{FrameNodesError, build_frame_table, decode_frame_nodes};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt profile: {0}")]
    FrameNodes(#[from] FrameNodesError),
}

/// Parse a profile payload as served by the profiling backend.
///
/// Decoding is all-or-nothing: a structural problem anywhere in
/// `frame_nodes` fails the load instead of yielding a partial tree.
pub fn parse_profile(data: &[u8]) -> Result<FrameTable, ParseError> {
    let payload: ProfilePayload = serde_json::from_slice(data)?;
    Ok(build_frame_table(&payload)?)
}
