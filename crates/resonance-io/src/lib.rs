//! Audio I/O layer for the resonance engine.
//!
//! Everything in this crate is an external collaborator to the simulation
//! kernel (`resonance-core`/`resonance-spatial`), not part of it: WAV file
//! I/O, device enumeration, and the realtime output adapter that pulls
//! fixed-size blocks from a [`resonance_core::graph::Simulation`] and pushes
//! them to a platform audio device via [cpal](https://docs.rs/cpal).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use resonance_io::backend::{AudioBackend, BackendStreamConfig};
//! use resonance_io::cpal_backend::CpalBackend;
//! use resonance_io::pump::run_simulation_output;
//!
//! let backend = CpalBackend::new();
//! let config = BackendStreamConfig::default();
//! let _stream = run_simulation_output(&backend, sim, output_node, &config)?;
//! // Stream plays until `_stream` is dropped.
//! ```

pub mod backend;
pub mod cpal_backend;
pub mod pump;
mod stream;
mod wav;

pub use stream::{AudioDevice, AudioStream, StreamConfig, default_device, list_devices};
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, read_wav_planar, write_wav, write_wav_planar};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
