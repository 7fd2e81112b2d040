//! Config file source: an explicit path, or the per-user default
//! (`$XDG_CONFIG_HOME/hotelc/config.toml` on Linux).

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use tracing::debug;

/// Path to the per-user config file, if a home directory can be resolved.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "hotelc").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Add an explicit config file. The format follows the extension (TOML or JSON).
/// A missing explicit file is an error.
pub fn add_explicit(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    Ok(builder.add_source(File::from(path).required(true)))
}

/// Add the per-user config file when it exists.
pub fn add_default(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => Ok(builder.add_source(File::from(path).required(false))),
        Some(path) => {
            debug!(config_path = %path.display(), "No user configuration file, using defaults");
            Ok(builder)
        }
        None => Ok(builder),
    }
}
