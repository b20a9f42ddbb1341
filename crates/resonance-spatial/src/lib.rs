//! 3D environment and source subsystem for the resonance engine.
//!
//! Builds on [`resonance_core::graph`]'s node graph/scheduler/simulation
//! to provide a listener-centric spatialization layer: an [`Environment`]
//! owning the 8-channel main bus and any number of effect-send buses, and
//! [`Source`]s that resolve distance attenuation, reverb-send gain
//! splitting, and cull state once per block against the listener's
//! current transform.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use resonance_core::graph::Simulation;
//! use resonance_core::hrtf::HrtfData;
//! use resonance_spatial::Environment;
//!
//! let sim = Simulation::new(48_000.0, 256);
//! let hrtf = Arc::new(HrtfData::default_dataset(48_000.0));
//! let env = Environment::new(&sim, hrtf);
//! sim.set_output_node(env.node_id());
//!
//! let source = env.create_source()?;
//! source.set_position([1.0, 0.0, -2.0])?;
//! # Ok::<(), resonance_spatial::SpatialError>(())
//! ```

mod distance;
mod effect_send;
mod environment;
mod error;
mod registry;
mod source;
mod transform;

pub use distance::{DistanceModel, model_gain};
pub use effect_send::EffectSendSlot;
pub use environment::{DEFAULT_PLAY_CACHE_CAPACITY, Environment};
pub use error::SpatialError;
pub use source::Source;
pub use transform::{Vec3, WorldToListener};
