//! Event Recorders
//!
//! One recorder per event category. Each checks enablement first, derives a
//! fixed attribute set, records metrics and, for player and block events, drives
//! the session tracker. [`dispatch`] routes a [`DomainEvent`] to its recorder and
//! contains any panic so telemetry never interrupts the delivering caller.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::engine::TelemetryContext;
use crate::events::DomainEvent;

pub mod block;
pub mod player;
pub mod server;
pub mod world;

/// Route one event to its recorder.
pub fn dispatch(ctx: &TelemetryContext, event: &DomainEvent) {
    guarded(event.name(), || match event {
        DomainEvent::PlayerConnect(player) => player::connect(ctx, player),
        DomainEvent::PlayerDisconnect(player) => player::disconnect(ctx, player),
        DomainEvent::PlayerReady(player) => player::ready(ctx, player),
        DomainEvent::BlockPlace(block) => block::place(ctx, block),
        DomainEvent::BlockBreak(block) => block::break_block(ctx, block),
        DomainEvent::BlockUse(block) => block::use_block(ctx, block),
        DomainEvent::WorldAdd(world) => world::add(ctx, world),
        DomainEvent::WorldRemove(world) => world::remove(ctx, world),
        DomainEvent::WorldStart(world) => world::start(ctx, world),
        DomainEvent::ChunkLoad(chunk) => world::chunk_load(ctx, chunk),
        DomainEvent::ChunkUnload(chunk) => world::chunk_unload(ctx, chunk),
        DomainEvent::ServerBoot(boot) => server::boot(ctx, boot),
        DomainEvent::ServerShutdown(shutdown) => server::shutdown(ctx, shutdown),
        DomainEvent::ServerTick(tick) => server::tick(ctx, tick),
    });
}

/// Run a recorder body, logging and swallowing any panic.
pub fn guarded(event: &str, f: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        warn!(event, reason = %reason, "Telemetry recorder failed, event skipped");
    }
}
