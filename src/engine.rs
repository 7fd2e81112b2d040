//! Lifecycle Controller
//!
//! `Uninitialized -> Initializing -> Running -> ShuttingDown -> Stopped`.
//! Initialization builds the pipeline before the instruments and publishes the
//! context only once everything is built. Shutdown is idempotent, may be called
//! at any point and never fails.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::{EngineError, PipelineError};
use crate::events::DomainEvent;
use crate::recorders;
use crate::telemetry::export::{OtlpTransport, TransportFactory};

mod context;

pub use context::TelemetryContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Running,
    ShuttingDown,
    Stopped,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initializing => "initializing",
            EngineState::Running => "running",
            EngineState::ShuttingDown => "shutting_down",
            EngineState::Stopped => "stopped",
        }
    }
}

pub struct TelemetryEngine {
    state: Mutex<EngineState>,
    context: RwLock<Option<Arc<TelemetryContext>>>,
    transport: Arc<dyn TransportFactory>,
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryEngine {
    /// Engine exporting over OTLP.
    pub fn new() -> Self {
        Self::with_transport(Arc::new(OtlpTransport))
    }

    pub fn with_transport(transport: Arc<dyn TransportFactory>) -> Self {
        Self {
            state: Mutex::new(EngineState::Uninitialized),
            context: RwLock::new(None),
            transport,
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    /// Build everything from `config` and start exporting.
    ///
    /// A disabled configuration moves straight to `Stopped`. Any failure leaves
    /// the engine `Stopped` with nothing running.
    pub fn initialize(&self, config: TelemetryConfig) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock();
            match *state {
                EngineState::Uninitialized => *state = EngineState::Initializing,
                EngineState::Stopped | EngineState::ShuttingDown => {
                    return Err(EngineError::Stopped)
                }
                EngineState::Initializing | EngineState::Running => {
                    return Err(EngineError::AlreadyInitialized)
                }
            }
        }

        if !config.enabled {
            info!("Telemetry disabled by configuration");
            *self.state.lock() = EngineState::Stopped;
            return Ok(());
        }

        let context = match TelemetryContext::build(config, self.transport.as_ref()) {
            Ok(context) => context,
            Err(err) => {
                warn!(error = %err, "Telemetry initialization failed");
                *self.state.lock() = EngineState::Stopped;
                return Err(err);
            }
        };

        let mut state = self.state.lock();
        if *state != EngineState::Initializing {
            // A shutdown arrived while building.
            drop(state);
            context.teardown();
            *self.state.lock() = EngineState::Stopped;
            info!("Telemetry initialization aborted by shutdown");
            return Err(EngineError::Aborted);
        }
        *self.context.write() = Some(Arc::new(context));
        *state = EngineState::Running;
        info!("Telemetry engine running");
        Ok(())
    }

    /// Close every session, end the server span and flush the pipeline. Safe to
    /// call repeatedly and from any state.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                EngineState::Uninitialized => {
                    *state = EngineState::Stopped;
                    return;
                }
                EngineState::Initializing => {
                    // initialize() observes this and tears down what it built.
                    *state = EngineState::ShuttingDown;
                    return;
                }
                EngineState::Running => *state = EngineState::ShuttingDown,
                EngineState::ShuttingDown | EngineState::Stopped => {
                    debug!(state = state.as_str(), "Shutdown already in progress or done");
                    return;
                }
            }
        }

        info!("Telemetry engine shutting down");
        let context = self.context.write().take();
        if let Some(context) = context {
            context.teardown();
        }
        *self.state.lock() = EngineState::Stopped;
        info!("Telemetry engine stopped");
    }

    /// The running context, if any.
    pub fn context(&self) -> Option<Arc<TelemetryContext>> {
        self.context.read().clone()
    }

    /// Record one domain event. A no-op unless running; never panics.
    pub fn handle(&self, event: &DomainEvent) {
        if let Some(context) = self.context() {
            recorders::dispatch(&context, event);
        }
    }

    /// Run `f` against the running context under the recorder panic guard. This
    /// is the entry point for host types implementing the accessor traits.
    pub fn observe<F>(&self, what: &str, f: F)
    where
        F: FnOnce(&TelemetryContext),
    {
        if let Some(context) = self.context() {
            recorders::guarded(what, || f(&context));
        }
    }

    /// Export pending metrics and spans now.
    pub fn force_flush(&self) -> Result<(), PipelineError> {
        match self.context() {
            Some(context) => context.force_flush(),
            None => Ok(()),
        }
    }
}

impl Drop for TelemetryEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PlayerInfo;
    use crate::telemetry::export::InMemoryTransport;

    fn engine() -> (TelemetryEngine, InMemoryTransport) {
        let transport = InMemoryTransport::new();
        (
            TelemetryEngine::with_transport(Arc::new(transport.clone())),
            transport,
        )
    }

    #[test]
    fn initialize_then_shutdown() {
        let (engine, _transport) = engine();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        engine.initialize(TelemetryConfig::default()).unwrap();
        assert!(engine.is_running());
        assert!(matches!(
            engine.initialize(TelemetryConfig::default()),
            Err(EngineError::AlreadyInitialized)
        ));
        engine.shutdown();
        engine.shutdown();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(engine.context().is_none());
    }

    #[test]
    fn disabled_config_stops_immediately() {
        let (engine, transport) = engine();
        let config = TelemetryConfig {
            enabled: false,
            ..Default::default()
        };
        engine.initialize(config).unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
        engine.handle(&DomainEvent::PlayerConnect(PlayerInfo::new("u", "n")));
        assert!(transport.resource().is_none());
    }

    #[test]
    fn invalid_config_fails_and_stops() {
        let (engine, _transport) = engine();
        let mut config = TelemetryConfig::default();
        config.exporter.endpoint = "::not a url::".to_string();
        assert!(matches!(
            engine.initialize(config),
            Err(EngineError::Config(_))
        ));
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(engine.context().is_none());
    }

    #[test]
    fn shutdown_before_initialize_is_safe() {
        let (engine, _transport) = engine();
        engine.shutdown();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(matches!(
            engine.initialize(TelemetryConfig::default()),
            Err(EngineError::Stopped)
        ));
    }

    #[test]
    fn observe_contains_panics() {
        let (engine, _transport) = engine();
        engine.initialize(TelemetryConfig::default()).unwrap();
        engine.observe("custom", |_| panic!("recorder bug"));
        assert!(engine.is_running());
        engine.shutdown();
    }
}
