//! ConfigLoader: layered construction of a [`TelemetryConfig`].

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::merge::merge_policy;
use crate::config::sources::{env, file};
use crate::config::{EnvVars, TelemetryConfig};
use crate::error::ConfigError;

/// Builds a validated configuration from defaults, an optional file and the
/// environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    use_default_file: bool,
    env: EnvVars,
}

impl ConfigLoader {
    /// Loader over defaults only, with an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader reading the process environment and the per-user config file.
    pub fn from_process() -> Self {
        Self {
            file: None,
            use_default_file: true,
            env: EnvVars::from_process(),
        }
    }

    /// Read this file instead of the per-user default.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self, env: EnvVars) -> Self {
        self.env = env;
        self
    }

    /// Merge all sources, deserialize and validate.
    pub fn load(&self) -> Result<TelemetryConfig, ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        builder = match &self.file {
            Some(path) => file::add_explicit(builder, path)?,
            None if self.use_default_file => file::add_default(builder)?,
            None => builder,
        };
        builder = env::add_to_builder(builder, &self.env)?;

        let config: TelemetryConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            service = %config.service.name,
            endpoint = %config.exporter.endpoint,
            protocol = %config.exporter.protocol,
            "Telemetry configuration loaded"
        );
        Ok(config)
    }
}
