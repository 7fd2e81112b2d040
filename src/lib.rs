//! hotelc: game server telemetry engine.
//!
//! Turns domain events (players joining, blocks changing, worlds loading, the
//! server booting and stopping) into OTLP metrics and per-player session traces,
//! exported in the background so the delivering thread never waits on the
//! network.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod global;
pub mod logging;
pub mod recorders;
pub mod telemetry;

pub use config::{ConfigLoader, TelemetryConfig};
pub use engine::{EngineState, TelemetryContext, TelemetryEngine};
pub use error::{ConfigError, EngineError, ExportError, PipelineError};
pub use events::DomainEvent;
