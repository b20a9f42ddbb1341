//! Configuration loading for the resonance audio engine.
//!
//! This crate deserializes simulation and device parameters — sample
//! rate, block size, output device name, HRTF dataset path, `play_async`
//! cache capacity — from a TOML file, with platform-specific path
//! resolution for locating that file.
//!
//! # Example
//!
//! ```rust,no_run
//! use resonance_config::{SimulationConfig, paths};
//!
//! let path = paths::find_config("resonance").unwrap_or_else(paths::default_config_path);
//! let config = SimulationConfig::load(&path).unwrap_or_default();
//! ```

mod error;
mod simulation;

/// Platform-specific paths for the simulation config file.
pub mod paths;

pub use error::ConfigError;
pub use simulation::SimulationConfig;
