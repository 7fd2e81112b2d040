//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources win key by key. Maps (`exporter.headers`,
//! `resource_attributes`) merge entry by entry rather than being replaced.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

use crate::config::TelemetryConfig;

/// Create a Config builder seeded with every default value.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&TelemetryConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}

/// Apply a single-key override on top of all other sources.
///
/// Blank values are ignored so an exported-but-empty variable does not erase
/// a configured value.
pub fn apply_override(
    builder: ConfigBuilder<DefaultState>,
    key: &str,
    value: Option<&str>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => builder.set_override(key, value.to_string()),
        _ => Ok(builder),
    }
}
