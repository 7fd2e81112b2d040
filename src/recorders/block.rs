//! Block place, break and use.

use crate::engine::TelemetryContext;
use crate::events::BlockSource;
use crate::recorders::player::session_key;
use crate::telemetry::attributes::{identity_or_unknown, keys, AttributeSet};
use crate::telemetry::instruments::InstrumentId;

/// Block type, coordinates, world and acting player. Coordinates and the actor
/// are omitted when unknown.
pub fn block_attributes<B: BlockSource + ?Sized>(block: &B) -> AttributeSet {
    let position = block.position();
    let actor = block.actor();
    AttributeSet::with_capacity(7)
        .with(keys::BLOCK_TYPE, identity_or_unknown(block.block_type()))
        .with_opt(keys::BLOCK_X, position.map(|p| p.x))
        .with_opt(keys::BLOCK_Y, position.map(|p| p.y))
        .with_opt(keys::BLOCK_Z, position.map(|p| p.z))
        .with(keys::WORLD_NAME, identity_or_unknown(block.world_name()))
        .with_opt(
            keys::PLAYER_UUID,
            actor.map(|p| identity_or_unknown(p.player_uuid())),
        )
        .with_opt(
            keys::PLAYER_NAME,
            actor.map(|p| identity_or_unknown(p.player_name())),
        )
}

fn record<B: BlockSource + ?Sized>(
    ctx: &TelemetryContext,
    block: &B,
    instrument: InstrumentId,
    span_event: &'static str,
) {
    let counting = ctx.instruments().is_enabled(instrument);
    let session = if ctx.config().tracing.block_operations_enabled() {
        ctx.sessions()
            .zip(block.actor().and_then(|actor| session_key(actor)))
    } else {
        None
    };
    if !counting && session.is_none() {
        return;
    }

    let attributes = block_attributes(block);
    if let Some((sessions, key)) = session {
        sessions.append_event(&key, span_event, attributes.clone());
    }
    if counting {
        ctx.instruments().increment(instrument, attributes);
    }
}

pub fn place<B: BlockSource + ?Sized>(ctx: &TelemetryContext, block: &B) {
    record(ctx, block, InstrumentId::BlocksPlaced, "block.placed");
}

pub fn break_block<B: BlockSource + ?Sized>(ctx: &TelemetryContext, block: &B) {
    record(ctx, block, InstrumentId::BlocksBroken, "block.broken");
}

pub fn use_block<B: BlockSource + ?Sized>(ctx: &TelemetryContext, block: &B) {
    record(ctx, block, InstrumentId::BlockInteractions, "block.used");
}
