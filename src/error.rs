//! Error types for the hotelc telemetry engine.
//!
//! Only configuration and pipeline construction errors ever reach a caller.
//! Export errors stop at the pipeline boundary and are logged there.

use std::time::Duration;

use thiserror::Error;

/// Configuration errors, fatal at initialize.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Unsupported {field}: {value}")]
    Unsupported { field: &'static str, value: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Errors raised while building or tearing down the exporter pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid exporter endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid exporter header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Failed to start export runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Transport construction failed: {0}")]
    Transport(String),

    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),
}

/// Errors from a single export call. Never retried.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Collector rejected export with status {status}: {message}")]
    Rejected { status: String, message: String },

    #[error("Export timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to encode export payload: {0}")]
    Encode(String),

    #[error("Exporter already shut down")]
    Shutdown,
}

/// Lifecycle controller errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Telemetry engine already initialized")]
    AlreadyInitialized,

    #[error("Telemetry engine is stopped")]
    Stopped,

    #[error("Initialization aborted by a concurrent shutdown")]
    Aborted,
}
