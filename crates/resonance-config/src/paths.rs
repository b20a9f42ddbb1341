//! Platform-specific paths for the simulation configuration file.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/resonance/` (Linux), `~/Library/Application
//!   Support/resonance/` (macOS), `%APPDATA%\resonance\` (Windows)
//! - **System config**: `/etc/resonance/` (Linux), `/Library/Application
//!   Support/resonance/` (macOS)

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "resonance";

/// Name of the config file within the config directory.
const CONFIG_FILE_NAME: &str = "resonance.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME)
}

/// Returns the system-wide configuration directory.
pub fn system_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc").join(APP_NAME)
    }
    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Library/Application Support").join(APP_NAME)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME)
    }
}

/// Locates a config file by name or path.
///
/// The argument can be:
/// - An absolute or relative path to a TOML file
/// - A bare name (with or without `.toml`), resolved against the user
///   config directory and then the system config directory
///
/// Falls back to `None` if nothing matches, in which case callers should
/// use [`crate::SimulationConfig::default`].
pub fn find_config(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") { name.to_string() } else { format!("{name}.toml") };

    let user_path = user_config_dir().join(&filename);
    if user_path.is_file() {
        return Some(user_path);
    }

    let system_path = system_config_dir().join(&filename);
    if system_path.is_file() {
        return Some(system_path);
    }

    None
}

/// Returns the default path a new config file should be written to.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Ensures the user configuration directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn user_config_dir_names_the_app() {
        let dir = user_config_dir();
        assert!(dir.to_string_lossy().contains("resonance"));
    }

    #[test]
    fn system_config_dir_names_the_app() {
        let dir = system_config_dir();
        assert!(dir.to_string_lossy().contains("resonance"));
    }

    #[test]
    fn find_config_resolves_an_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "sample_rate = 48000.0").unwrap();

        let found = find_config(config_path.to_str().unwrap());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn find_config_returns_none_when_missing() {
        assert!(find_config("nonexistent_resonance_config_12345").is_none());
    }
}
