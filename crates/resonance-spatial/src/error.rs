//! Errors raised by the environment/source subsystem.

use resonance_core::graph::GraphError;

/// Errors raised by [`crate::Environment`] and [`crate::Source`] operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SpatialError {
    /// An effect send was declared with a channel count outside
    /// `{1,2,4,6,8}`.
    #[error("unsupported effect send channel count {0} (expected one of 1, 2, 4, 6, 8)")]
    UnsupportedChannelCount(usize),
    /// A reverb send was declared with a channel count other than 4.
    #[error("reverb sends must have exactly 4 channels, got {0}")]
    ReverbChannelMismatch(usize),
    /// `feed_effect`/`stop_feeding_effect` referenced a send id that was
    /// never registered via [`crate::Environment::add_effect_send`].
    #[error("unknown effect send id {0}")]
    UnknownSendId(usize),
    /// The `playAsync` cache capacity was set to zero, which would make
    /// every play allocate a fresh pair and immediately release it instead
    /// of ever recycling — almost certainly not what the caller wants.
    #[error("play cache capacity must be at least 1")]
    ZeroCacheCapacity,
    /// An underlying graph mutation failed (invalid handle, slot, property).
    #[error(transparent)]
    Graph(#[from] GraphError),
}
