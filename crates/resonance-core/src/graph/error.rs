//! Error types for graph mutation and property access.

use super::node::NodeId;
use super::property::{PropertyError, PropertyTag};

/// Errors raised by [`super::Graph`] mutation and property APIs.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum GraphError {
    /// A `NodeId` that does not (or no longer) refers to a live node.
    #[error("invalid node handle {0:?}")]
    InvalidHandle(NodeId),
    /// A slot index outside the node's declared input/output count.
    #[error("slot index {index} out of range on node {node:?} ({kind})")]
    InvalidSlot {
        /// The node being addressed.
        node: NodeId,
        /// Whether `index` was an input or output slot.
        kind: &'static str,
        /// The offending index.
        index: usize,
    },
    /// An effect send connection declared a channel count not in
    /// `{1,2,4,6,8}`, or a reverb send that is not exactly 4 channels.
    #[error("unsupported channel count {0} (expected one of 1, 2, 4, 6, 8)")]
    UnsupportedChannelCount(usize),
    /// Property access failed — range, type mismatch, unknown tag, or a
    /// write to a forwarded property.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// A forward target referenced a tag that does not exist on the target
    /// node.
    #[error("forward target `{0}` does not exist")]
    InvalidForwardTarget(PropertyTag),
}
