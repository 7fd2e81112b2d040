//! Environment source: `HOTELC__SECTION__KEY` variables plus the two standard
//! OpenTelemetry overrides.

use std::collections::HashMap;

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

use crate::config::merge::merge_policy::apply_override;

pub const PREFIX: &str = "HOTELC";
pub const SEPARATOR: &str = "__";
pub const OTEL_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

/// Snapshot of environment variables consulted by the loader.
///
/// Tests build one from pairs so they never touch the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Add `HOTELC__*` variables, then the OTEL endpoint and service name overrides.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    env: &EnvVars,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let prefixed: HashMap<String, String> = env
        .vars
        .iter()
        .filter(|(key, _)| key.starts_with(PREFIX) && key[PREFIX.len()..].starts_with(SEPARATOR))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let builder = builder.add_source(
        Environment::with_prefix(PREFIX)
            .prefix_separator(SEPARATOR)
            .separator(SEPARATOR)
            .try_parsing(true)
            .source(Some(prefixed)),
    );

    let builder = apply_override(builder, "exporter.endpoint", env.get(OTEL_ENDPOINT))?;
    apply_override(builder, "service.name", env.get(OTEL_SERVICE_NAME))
}
