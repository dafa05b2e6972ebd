//! Configuration file discovery and loading
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `<user config dir>/tvdash/config.toml`
//!
//! A missing config file is never fatal: callers get `T::default()` and a warning.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the per-user configuration folder
pub const CONFIG_DIR_NAME: &str = "tvdash";

/// Name of the configuration file inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Logging configuration (`[logging]` table)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve which config file to read
///
/// Returns `None` when neither the CLI argument, the environment variable nor the
/// per-user default names a file. CLI and environment paths are returned even if
/// they do not exist so that [`load_toml`] can warn about them.
pub fn config_file_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: per-user config file
    default_config_file().filter(|p| p.exists())
}

/// Platform config file location (`~/.config/tvdash/config.toml` on Linux)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load a TOML config file into `T`
///
/// - `None` path or missing file: warning + `T::default()`
/// - unreadable file: [`Error::Config`]
/// - malformed TOML: [`Error::Toml`]
pub fn load_toml<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        debug!("No config file configured, using built-in defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let value = toml::from_str::<T>(&content)?;
    debug!("Loaded config from {}", path.display());
    Ok(value)
}
