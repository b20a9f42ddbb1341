//! Simulation and device parameters loaded from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Sample rates a [`SimulationConfig`] is willing to accept.
const MIN_SAMPLE_RATE: f32 = 1000.0;
const MAX_SAMPLE_RATE: f32 = 384_000.0;

/// Block sizes below this make the scheduler's per-block overhead dominate;
/// above this, output latency becomes audible.
const MIN_BLOCK_SIZE: usize = 1;
const MAX_BLOCK_SIZE: usize = 8192;

/// Top-level simulation and device configuration, deserialized from a
/// `resonance.toml` file via `serde` + `toml`.
///
/// Every field has a sensible default, so a missing config file (or a
/// config file that only overrides a handful of fields) is never an
/// error at the configuration layer — callers fall back to
/// [`SimulationConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulation sample rate, in Hz.
    pub sample_rate: f32,
    /// Samples per processing block.
    pub block_size: usize,
    /// Output device name to bind to. `None` selects the host default.
    pub device_name: Option<String>,
    /// Path to an HRTF dataset file. `None` uses the built-in default
    /// dataset (see `resonance_core::hrtf::HrtfData::default_dataset`).
    pub hrtf_path: Option<PathBuf>,
    /// Maximum number of idle source/buffer-node pairs an `Environment`'s
    /// `play_async` cache retains for reuse.
    pub play_cache_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 256,
            device_name: None,
            hrtf_path: None,
            play_cache_capacity: 32,
        }
    }
}

impl SimulationConfig {
    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] if the file cannot be read,
    /// [`ConfigError::TomlParse`] if it isn't valid TOML, or
    /// [`ConfigError::Range`] if a loaded value fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves this configuration to a TOML file, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CreateDir`] if the parent directory cannot
    /// be created, [`ConfigError::TomlSerialize`] if serialization fails,
    /// or [`ConfigError::WriteFile`] if the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
            }
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Validates every field's range, matching the kernel's own clamping
    /// rules so a bad config fails fast instead of silently clamping at
    /// the simulation layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Range`] naming the first field that's out
    /// of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(ConfigError::range(
                "sample_rate",
                self.sample_rate,
                format!("must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE}"),
            ));
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(ConfigError::range(
                "block_size",
                self.block_size,
                format!("must be between {MIN_BLOCK_SIZE} and {MAX_BLOCK_SIZE}"),
            ));
        }
        if self.play_cache_capacity == 0 {
            return Err(ConfigError::range("play_cache_capacity", 0, "must be nonzero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn roundtrips_through_toml() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = SimulationConfig {
            sample_rate: 44_100.0,
            block_size: 512,
            device_name: Some("Scarlett 2i2".to_string()),
            hrtf_path: Some(PathBuf::from("/usr/share/resonance/hrtf.bin")),
            play_cache_capacity: 16,
        };
        config.save(file.path()).unwrap();

        let loaded = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "block_size = 128").unwrap();

        let loaded = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(loaded.block_size, 128);
        assert_eq!(loaded.sample_rate, SimulationConfig::default().sample_rate);
    }

    #[test]
    fn rejects_zero_block_size() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "block_size = 0").unwrap();

        let err = SimulationConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Range { field: "block_size", .. }));
    }

    #[test]
    fn rejects_absurd_sample_rate() {
        let config = SimulationConfig { sample_rate: 1.0, ..SimulationConfig::default() };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Range { field: "sample_rate", .. }));
    }

    #[test]
    fn rejects_zero_play_cache_capacity() {
        let config = SimulationConfig { play_cache_capacity: 0, ..SimulationConfig::default() };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Range { field: "play_cache_capacity", .. }));
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = SimulationConfig::load("/nonexistent/resonance/config/path.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
