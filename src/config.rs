//! Configuration System
//!
//! Immutable snapshot of everything the telemetry engine needs: which subsystems
//! are enabled, where and how to export, how often, how much to sample, and which
//! resource attributes to attach. Built once (see [`ConfigLoader`]) and handed to
//! the engine by value; nothing downstream mutates it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::LoggingConfig;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::env::EnvVars;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Master switch. When false the engine never starts.
    pub enabled: bool,

    pub service: ServiceConfig,

    pub exporter: ExporterConfig,

    pub metrics: MetricsConfig,

    pub tracing: TracingConfig,

    /// Free-form resource attributes attached to every export.
    pub resource_attributes: BTreeMap<String, String>,

    /// Logging configuration (consumed by the binary, ignored by the engine)
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service: ServiceConfig::default(),
            exporter: ExporterConfig::default(),
            metrics: MetricsConfig::default(),
            tracing: TracingConfig::default(),
            resource_attributes: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TelemetryConfig {
    /// Validate the entire configuration.
    ///
    /// Sample rates are not validated here: out-of-range values are clamped by
    /// [`TracingConfig::effective_sample_rate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "service.name",
                reason: "must not be empty".to_string(),
            });
        }
        self.exporter.validate()?;
        self.metrics.validate()?;
        self.tracing.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub namespace: String,
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "hytale-server".to_string(),
            namespace: "hytale".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

/// Wire protocol used to reach the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Protocol {
    /// OTLP over gRPC, sent to the bare endpoint.
    Grpc,
    /// OTLP protobuf over HTTP, sent to `<endpoint>/v1/<signal>`.
    Http,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Grpc => "grpc",
            Protocol::Http => "http",
        }
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grpc" => Ok(Protocol::Grpc),
            "http" | "http/protobuf" => Ok(Protocol::Http),
            other => Err(ConfigError::Unsupported {
                field: "exporter.protocol",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Protocol {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Compression {
    None,
    Gzip,
}

impl FromStr for Compression {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            other => Err(ConfigError::Unsupported {
                field: "exporter.compression",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Compression {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Shared transport settings for the metric and span exporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub endpoint: String,
    pub protocol: Protocol,
    pub compression: Compression,
    pub timeout_ms: u64,
    pub headers: BTreeMap<String, String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4317".to_string(),
            protocol: Protocol::Grpc,
            compression: Compression::Gzip,
            timeout_ms: 10_000,
            headers: BTreeMap::new(),
        }
    }
}

impl ExporterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Endpoint for one signal. HTTP appends the fixed OTLP path, gRPC uses the
    /// endpoint as given.
    pub fn signal_endpoint(&self, signal: Signal) -> String {
        match self.protocol {
            Protocol::Grpc => self.endpoint.clone(),
            Protocol::Http => {
                format!("{}{}", self.endpoint.trim_end_matches('/'), signal.http_path())
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| ConfigError::Invalid {
            field: "exporter.endpoint",
            reason: format!("{}: {}", self.endpoint, e),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Unsupported {
                field: "exporter.endpoint scheme",
                value: url.scheme().to_string(),
            });
        }
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid {
                field: "exporter.endpoint",
                reason: format!("{} has no host", self.endpoint),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "exporter.timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        for name in self.headers.keys() {
            reqwest::header::HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ConfigError::Invalid {
                    field: "exporter.headers",
                    reason: format!("{name}: {e}"),
                }
            })?;
        }
        Ok(())
    }
}

/// Exported signal stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Metrics,
    Traces,
}

impl Signal {
    pub fn http_path(self) -> &'static str {
        match self {
            Signal::Metrics => "/v1/metrics",
            Signal::Traces => "/v1/traces",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Metrics => "metrics",
            Signal::Traces => "traces",
        }
    }
}

/// Metric category owning a group of instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Player,
    Block,
    World,
    Server,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Player => "player",
            Category::Block => "block",
            Category::World => "world",
            Category::Server => "server",
        }
    }
}

/// Category-specific tracking switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubFlag {
    Connections,
    Sessions,
    Placement,
    Breaking,
    Interactions,
    WorldLoading,
    ChunkLoading,
    Tps,
    Memory,
    Uptime,
}

impl SubFlag {
    pub fn category(self) -> Category {
        match self {
            SubFlag::Connections | SubFlag::Sessions => Category::Player,
            SubFlag::Placement | SubFlag::Breaking | SubFlag::Interactions => Category::Block,
            SubFlag::WorldLoading | SubFlag::ChunkLoading => Category::World,
            SubFlag::Tps | SubFlag::Memory | SubFlag::Uptime => Category::Server,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub export_interval_ms: u64,
    /// Distinct attribute sets kept per instrument before new ones fold into
    /// the overflow series.
    pub cardinality_limit: usize,
    pub player: PlayerMetricsConfig,
    pub block: BlockMetricsConfig,
    pub world: WorldMetricsConfig,
    pub server: ServerMetricsConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            export_interval_ms: 30_000,
            cardinality_limit: 2_000,
            player: PlayerMetricsConfig::default(),
            block: BlockMetricsConfig::default(),
            world: WorldMetricsConfig::default(),
            server: ServerMetricsConfig::default(),
        }
    }
}

impl MetricsConfig {
    pub fn export_interval(&self) -> Duration {
        Duration::from_millis(self.export_interval_ms)
    }

    /// Whether metrics are on and the given category is enabled.
    pub fn category_enabled(&self, category: Category) -> bool {
        self.enabled
            && match category {
                Category::Player => self.player.enabled,
                Category::Block => self.block.enabled,
                Category::World => self.world.enabled,
                Category::Server => self.server.enabled,
            }
    }

    /// Whether metrics, the owning category and the sub-flag are all enabled.
    pub fn tracks(&self, flag: SubFlag) -> bool {
        if !self.category_enabled(flag.category()) {
            return false;
        }
        match flag {
            SubFlag::Connections => self.player.track_connections,
            SubFlag::Sessions => self.player.track_sessions,
            SubFlag::Placement => self.block.track_placement,
            SubFlag::Breaking => self.block.track_breaking,
            SubFlag::Interactions => self.block.track_interactions,
            SubFlag::WorldLoading => self.world.track_world_loading,
            SubFlag::ChunkLoading => self.world.track_chunk_loading,
            SubFlag::Tps => self.server.track_tps,
            SubFlag::Memory => self.server.track_memory,
            SubFlag::Uptime => self.server.track_uptime,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.export_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "metrics.export_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.enabled && self.cardinality_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "metrics.cardinality_limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerMetricsConfig {
    pub enabled: bool,
    pub track_connections: bool,
    pub track_sessions: bool,
}

impl Default for PlayerMetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            track_connections: true,
            track_sessions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockMetricsConfig {
    pub enabled: bool,
    pub track_placement: bool,
    pub track_breaking: bool,
    pub track_interactions: bool,
}

impl Default for BlockMetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            track_placement: true,
            track_breaking: true,
            track_interactions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldMetricsConfig {
    pub enabled: bool,
    pub track_world_loading: bool,
    pub track_chunk_loading: bool,
}

impl Default for WorldMetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            track_world_loading: true,
            track_chunk_loading: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerMetricsConfig {
    pub enabled: bool,
    pub track_tps: bool,
    pub track_memory: bool,
    pub track_uptime: bool,
}

impl Default for ServerMetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            track_tps: true,
            track_memory: true,
            track_uptime: true,
        }
    }
}

/// What to do when a session is opened for a key that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReopenPolicy {
    /// End the stale span as superseded, then open the new one.
    Supersede,
    /// Drop the stale span unexported and keep only the new one.
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub sample_rate: f64,
    pub trace_player_sessions: bool,
    pub trace_block_operations: bool,
    pub session_reopen_policy: ReopenPolicy,
    pub batch: BatchConfig,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: 1.0,
            trace_player_sessions: true,
            trace_block_operations: false,
            session_reopen_policy: ReopenPolicy::Supersede,
            batch: BatchConfig::default(),
        }
    }
}

impl TracingConfig {
    /// Sample rate clamped to `[0, 1]`. Non-finite values fall back to 1.0.
    pub fn effective_sample_rate(&self) -> f64 {
        if self.sample_rate.is_finite() {
            self.sample_rate.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    pub fn sessions_enabled(&self) -> bool {
        self.enabled && self.trace_player_sessions
    }

    pub fn block_operations_enabled(&self) -> bool {
        self.enabled && self.trace_block_operations
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        self.batch.validate()
    }
}

/// Span batching thresholds for the trace pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Spans buffered before new ones are dropped.
    pub max_queue_size: usize,
    /// Spans per export call.
    pub max_export_batch_size: usize,
    /// Flush interval for partially filled batches.
    pub scheduled_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay_ms: 5_000,
        }
    }
}

impl BatchConfig {
    pub fn scheduled_delay(&self) -> Duration {
        Duration::from_millis(self.scheduled_delay_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_queue_size == 0 {
            return Err(ConfigError::Invalid {
                field: "tracing.batch.max_queue_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_export_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "tracing.batch.max_export_batch_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.scheduled_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tracing.batch.scheduled_delay_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
