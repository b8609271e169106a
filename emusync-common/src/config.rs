//! Configuration file resolution and TOML loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `EMUSYNC_CONFIG` environment variable
//! 3. User config file (`<config_dir>/emusync/config.toml`)
//! 4. System config file (`/etc/emusync/config.toml`, Linux only)
//!
//! A missing config file is not an error: callers fall back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "EMUSYNC_CONFIG";

/// Directory name used under the platform config directory
const APP_DIR: &str = "emusync";

/// File name of the bootstrap configuration
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve which config file to load.
///
/// Explicit paths (command line, environment) are returned even if the file does
/// not exist, so that a typo surfaces as a load error instead of silently using
/// defaults. Implicit locations are only returned when the file exists.
pub fn resolve_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    if let Some(path) = user_config_file() {
        if path.exists() {
            return Some(path);
        }
    }

    // Priority 4: System config file
    let system_config = system_config_file()?;
    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

/// Per-user config file location for the current platform
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
}

fn system_config_file() -> Option<PathBuf> {
    if cfg!(target_os = "linux") {
        Some(PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE_NAME))
    } else {
        None
    }
}

/// Parse a TOML file into `T`.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let value = toml::from_str(&content)?;
    debug!("Loaded config file {}", path.display());
    Ok(value)
}

/// Resolve and load a config file, falling back to `T::default()` when no file is found.
///
/// Returns the loaded value together with the path it was read from (if any).
pub fn load_or_default<T>(cli_arg: Option<&Path>) -> Result<(T, Option<PathBuf>)>
where
    T: DeserializeOwned + Default,
{
    match resolve_config_file(cli_arg) {
        Some(path) => {
            let value = load_toml(&path)?;
            info!("Using config file: {}", path.display());
            Ok((value, Some(path)))
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok((T::default(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let path = PathBuf::from("/nonexistent/emusync.toml");
        assert_eq!(resolve_config_file(Some(&path)), Some(path));
    }

    #[test]
    fn test_user_config_file_location() {
        if let Some(path) = user_config_file() {
            assert!(path.ends_with("emusync/config.toml"));
        }
    }
}
