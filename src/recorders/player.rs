//! Player connect, disconnect and ready.

use tracing::debug;

use crate::engine::TelemetryContext;
use crate::events::PlayerSource;
use crate::telemetry::attributes::{identity_or_unknown, keys, AttributeSet};
use crate::telemetry::instruments::InstrumentId;
use crate::telemetry::sessions::{SessionKey, SessionStatus};

/// `player.uuid` and `player.name`, with the sentinel for missing values.
pub fn player_attributes<P: PlayerSource + ?Sized>(player: &P) -> AttributeSet {
    AttributeSet::with_capacity(2)
        .with(keys::PLAYER_UUID, identity_or_unknown(player.player_uuid()))
        .with(keys::PLAYER_NAME, identity_or_unknown(player.player_name()))
}

/// Session key: the uuid, else the name. `None` when the player has neither.
pub fn session_key<P: PlayerSource + ?Sized>(player: &P) -> Option<SessionKey> {
    [player.player_uuid(), player.player_name()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(SessionKey::from)
}

pub fn connect<P: PlayerSource + ?Sized>(ctx: &TelemetryContext, player: &P) {
    let instruments = ctx.instruments();
    let counting = instruments.is_enabled(InstrumentId::PlayersOnline)
        || instruments.is_enabled(InstrumentId::PlayerConnections);
    let sessions = ctx.sessions();
    if !counting && sessions.is_none() {
        return;
    }

    let attributes = player_attributes(player);
    if counting {
        instruments.add(InstrumentId::PlayersOnline, 1, attributes.clone());
        instruments.increment(InstrumentId::PlayerConnections, attributes.clone());
    }

    if let Some(sessions) = sessions {
        match session_key(player) {
            Some(key) => {
                sessions.open(key, attributes);
            }
            None => debug!("Player without identity, no session opened"),
        }
    }
}

pub fn disconnect<P: PlayerSource + ?Sized>(ctx: &TelemetryContext, player: &P) {
    let instruments = ctx.instruments();
    let counting = instruments.is_enabled(InstrumentId::PlayersOnline)
        || instruments.is_enabled(InstrumentId::PlayerDisconnections);
    let sessions = ctx.sessions();
    if !counting && sessions.is_none() {
        return;
    }

    if counting {
        let attributes = player_attributes(player);
        instruments.add(InstrumentId::PlayersOnline, -1, attributes.clone());
        instruments.increment(InstrumentId::PlayerDisconnections, attributes);
    }

    if let (Some(sessions), Some(key)) = (sessions, session_key(player)) {
        sessions.close(&key, SessionStatus::Completed);
    }
}

/// Adds `player.ready` to an open session. Never opens one.
pub fn ready<P: PlayerSource + ?Sized>(ctx: &TelemetryContext, player: &P) {
    let Some(sessions) = ctx.sessions() else {
        return;
    };
    let Some(key) = session_key(player) else {
        debug!("Player without identity, ready event dropped");
        return;
    };
    sessions.append_event(
        &key,
        "player.ready",
        AttributeSet::new().with(keys::PLAYER_NAME, identity_or_unknown(player.player_name())),
    );
}
