//! Concrete node behaviors built on the DSP primitives in this crate.
//!
//! Each submodule pairs one [`crate::graph::node::NodeBehavior`]
//! implementation with a `properties()` constructor for the
//! [`crate::graph::property::PropertyTable`] it expects — callers pass that
//! table to [`crate::graph::Simulation::create_node`] alongside the
//! behavior itself.

pub mod amplitude_panner;
pub mod buffer_node;
pub mod convolver;
pub mod crossfader;
pub mod crossfading_delay;
pub mod gain;
pub mod hrtf_panner;
pub mod multipanner;

pub use amplitude_panner::AmplitudePannerNode;
pub use buffer_node::BufferNode;
pub use convolver::ConvolverNode;
pub use crossfader::CrossfaderNode;
pub use crossfading_delay::CrossfadingDelayNode;
pub use gain::GainNode;
pub use hrtf_panner::HrtfPannerNode;
pub use multipanner::{MultipannerNode, Strategy};
