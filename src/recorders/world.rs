//! World add, remove and start, plus chunk load and unload.

use tracing::info;

use crate::engine::TelemetryContext;
use crate::events::{ChunkInfo, WorldSource};
use crate::telemetry::attributes::{identity_or_unknown, keys, AttributeSet};
use crate::telemetry::instruments::InstrumentId;

pub fn world_attributes<W: WorldSource + ?Sized>(world: &W) -> AttributeSet {
    AttributeSet::with_capacity(2)
        .with(keys::WORLD_NAME, identity_or_unknown(world.world_name()))
        .with_opt(keys::WORLD_ID, world.world_id().map(str::to_string))
}

fn record<W: WorldSource + ?Sized>(
    ctx: &TelemetryContext,
    world: &W,
    instrument: InstrumentId,
    span_event: &'static str,
) {
    let counting = ctx.instruments().is_enabled(instrument);
    let server_span = ctx.server_span();
    if !counting && server_span.is_none() {
        return;
    }
    let attributes = world_attributes(world);
    if let Some(server_span) = server_span {
        server_span.add_event(span_event, attributes.clone());
    }
    if counting {
        ctx.instruments().increment(instrument, attributes);
    }
}

pub fn add<W: WorldSource + ?Sized>(ctx: &TelemetryContext, world: &W) {
    record(ctx, world, InstrumentId::WorldsLoaded, "world.loaded");
}

pub fn remove<W: WorldSource + ?Sized>(ctx: &TelemetryContext, world: &W) {
    record(ctx, world, InstrumentId::WorldsUnloaded, "world.unloaded");
}

/// Logged only; no instrument covers world start.
pub fn start<W: WorldSource + ?Sized>(_ctx: &TelemetryContext, world: &W) {
    info!(world = %identity_or_unknown(world.world_name()), "World started");
}

fn chunk_attributes(chunk: &ChunkInfo) -> AttributeSet {
    AttributeSet::with_capacity(3)
        .with(keys::WORLD_NAME, identity_or_unknown(chunk.world.as_deref()))
        .with_opt(keys::CHUNK_X, chunk.x)
        .with_opt(keys::CHUNK_Z, chunk.z)
}

pub fn chunk_load(ctx: &TelemetryContext, chunk: &ChunkInfo) {
    if ctx.instruments().is_enabled(InstrumentId::ChunksLoaded) {
        ctx.instruments()
            .increment(InstrumentId::ChunksLoaded, chunk_attributes(chunk));
    }
}

pub fn chunk_unload(ctx: &TelemetryContext, chunk: &ChunkInfo) {
    if ctx.instruments().is_enabled(InstrumentId::ChunksUnloaded) {
        ctx.instruments()
            .increment(InstrumentId::ChunksUnloaded, chunk_attributes(chunk));
    }
}
