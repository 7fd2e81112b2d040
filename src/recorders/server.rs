//! Server boot, shutdown and tick.

use tracing::info;

use crate::engine::TelemetryContext;
use crate::events::{ServerBoot, ServerShutdown, ServerTick};
use crate::telemetry::attributes::{keys, AttributeSet};
use crate::telemetry::now_millis;

/// Opens the `server.lifecycle` span. A boot without a timestamp is stamped
/// with the time it was observed.
pub fn boot(ctx: &TelemetryContext, boot: &ServerBoot) {
    let boot_time_ms = boot.boot_time_ms.unwrap_or_else(now_millis);
    info!(boot_time_ms, "Server boot observed");
    if let Some(server_span) = ctx.server_span() {
        server_span.start(Some(boot_time_ms));
    }
}

/// Records `server.shutdown` on the lifecycle span. The span is ended by the
/// engine's shutdown.
pub fn shutdown(ctx: &TelemetryContext, shutdown: &ServerShutdown) {
    let Some(server_span) = ctx.server_span() else {
        return;
    };
    let attributes = AttributeSet::with_capacity(2)
        .with(
            keys::SHUTDOWN_TIME_MS,
            shutdown.shutdown_time_ms.unwrap_or_else(now_millis),
        )
        .with_opt(keys::SERVER_UPTIME_MS, server_span.uptime_ms());
    server_span.add_event("server.shutdown", attributes);
}

pub fn tick(ctx: &TelemetryContext, tick: &ServerTick) {
    ctx.instruments().record_tps(tick.tps);
}
