//! Process-wide engine registration for code that cannot be handed a context.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::engine::TelemetryEngine;

static ENGINE: RwLock<Option<Arc<TelemetryEngine>>> = parking_lot::const_rwlock(None);

/// Register `engine` as the process default, returning the one it replaced.
pub fn set_engine(engine: Arc<TelemetryEngine>) -> Option<Arc<TelemetryEngine>> {
    debug!("Registering global telemetry engine");
    ENGINE.write().replace(engine)
}

pub fn engine() -> Option<Arc<TelemetryEngine>> {
    ENGINE.read().clone()
}

/// Unregister the process default and shut it down.
pub fn shutdown_engine() {
    let engine = ENGINE.write().take();
    if let Some(engine) = engine {
        engine.shutdown();
    }
}
