//! Resonance Core - DSP primitives and node-graph kernel for realtime,
//! spatializable audio.
//!
//! This crate provides the foundational building blocks of the engine:
//! variable-length delay lines, block and FFT convolution, HRTF and
//! amplitude panning, channel remixing, a polyphase resampler, and the
//! node-graph kernel that ties per-node DSP behaviors into a scheduled,
//! property-driven simulation.
//!
//! # Core Abstractions
//!
//! ## Node Graph
//!
//! - [`graph::Simulation`] - the top-level realtime handle: sample rate,
//!   block size, scheduler, task queue, and mix lock
//! - [`graph::node::NodeBehavior`] - the per-node DSP/logic contract
//! - [`graph::property`] - the typed, rangeable, forwardable property
//!   system every node exposes
//! - [`graph::schedule::Scheduler`] - Kahn-style topological planning with
//!   liveness culling and one-block-delayed feedback tolerance
//!
//! ## Delay Lines
//!
//! - [`InterpolatedDelay`] - variable-length delay with linear/cubic
//!   interpolation
//! - [`FixedDelayLine`] - fixed-length delay (compile-time size)
//! - [`CrossfadingDelayLine`] - delay with click-free delay-time changes
//!
//! ## Spatialization Primitives
//!
//! - [`AmplitudePanner`] - equal-power amplitude panning to 1/2/4/6/8
//!   channels
//! - [`HrtfPanner`] - binaural panning via HRTF convolution with
//!   nearest/bilinear measurement interpolation and crossfading
//! - [`HrtfData`] - a loaded HRTF measurement set
//!
//! ## Convolution & Resampling
//!
//! - [`BlockConvolver`] - direct block convolution for short impulse
//!   responses
//! - [`FftConvolver`] - overlap-add FFT convolution for longer responses
//! - [`resample`] - polyphase FIR resampling between arbitrary integer
//!   sample rate ratios
//!
//! # no_std Support
//!
//! The DSP primitive modules (`delay`, `crossfade_delay`, `panner`,
//! `remix`, `math`) are `no_std` + `alloc` compatible for embedded targets.
//! The node-graph kernel, `convolve`, `resample`, `hrtf`, and
//! `buffer_asset` need heap collections and (for `convolve`/`hrtf`)
//! `rustfft`, and are gated behind the `std` feature (on by default).

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod crossfade_delay;
pub mod delay;
pub mod math;
pub mod remix;

#[cfg(feature = "std")]
pub mod buffer_asset;
#[cfg(feature = "std")]
pub mod convolve;
#[cfg(feature = "std")]
pub mod graph;
#[cfg(feature = "std")]
pub mod hrtf;
#[cfg(feature = "std")]
pub mod nodes;
#[cfg(feature = "std")]
pub mod panner;
#[cfg(feature = "std")]
pub mod resample;

pub use crossfade_delay::CrossfadingDelayLine;
pub use delay::{FixedDelayLine, InterpolatedDelay, Interpolation};
pub use math::{clamp, db_to_linear, lerp, linear_to_db, mono_sum, ms_to_samples, samples_to_ms};
pub use remix::{SUPPORTED_CHANNEL_COUNTS, build_matrix, is_supported_channel_count, remix_planar};

#[cfg(feature = "std")]
pub use buffer_asset::{Buffer, BufferStore};
#[cfg(feature = "std")]
pub use convolve::{BlockConvolver, FftConvolver};
#[cfg(feature = "std")]
pub use hrtf::{HrtfData, HrtfMeasurement};
#[cfg(feature = "std")]
pub use panner::{AmplitudePanner, HrtfPanner};
