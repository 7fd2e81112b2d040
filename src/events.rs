//! Domain events delivered by the host.
//!
//! The engine reads payloads only through the accessor traits below, so a host
//! may implement them for its own types and skip the plain structs entirely.

use serde::{Deserialize, Serialize};

/// Identity of a player.
pub trait PlayerSource {
    fn player_uuid(&self) -> Option<&str>;
    fn player_name(&self) -> Option<&str>;
}

/// A block placed, broken or used.
pub trait BlockSource {
    fn block_type(&self) -> Option<&str>;
    fn position(&self) -> Option<BlockPos>;
    fn world_name(&self) -> Option<&str>;
    /// The player who acted, if known.
    fn actor(&self) -> Option<&dyn PlayerSource>;
}

/// A world added, removed or started.
pub trait WorldSource {
    fn world_name(&self) -> Option<&str>;
    fn world_id(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub uuid: Option<String>,
    pub name: Option<String>,
}

impl PlayerInfo {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            name: Some(name.into()),
        }
    }
}

impl PlayerSource for PlayerInfo {
    fn player_uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    fn player_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub block_type: Option<String>,
    pub position: Option<BlockPos>,
    pub world: Option<String>,
    pub player: Option<PlayerInfo>,
}

impl BlockSource for BlockInfo {
    fn block_type(&self) -> Option<&str> {
        self.block_type.as_deref()
    }

    fn position(&self) -> Option<BlockPos> {
        self.position
    }

    fn world_name(&self) -> Option<&str> {
        self.world.as_deref()
    }

    fn actor(&self) -> Option<&dyn PlayerSource> {
        self.player.as_ref().map(|p| p as &dyn PlayerSource)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldInfo {
    pub name: Option<String>,
    pub id: Option<String>,
}

impl WorldSource for WorldInfo {
    fn world_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn world_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub world: Option<String>,
    pub x: Option<i64>,
    pub z: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerBoot {
    /// Milliseconds the host spent booting.
    pub boot_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerShutdown {
    /// Milliseconds the host spent shutting down.
    pub shutdown_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServerTick {
    pub tps: f64,
}

/// Every event the engine understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    PlayerConnect(PlayerInfo),
    PlayerDisconnect(PlayerInfo),
    PlayerReady(PlayerInfo),
    BlockPlace(BlockInfo),
    BlockBreak(BlockInfo),
    BlockUse(BlockInfo),
    WorldAdd(WorldInfo),
    WorldRemove(WorldInfo),
    WorldStart(WorldInfo),
    ChunkLoad(ChunkInfo),
    ChunkUnload(ChunkInfo),
    ServerBoot(ServerBoot),
    ServerShutdown(ServerShutdown),
    ServerTick(ServerTick),
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::PlayerConnect(_) => "player_connect",
            DomainEvent::PlayerDisconnect(_) => "player_disconnect",
            DomainEvent::PlayerReady(_) => "player_ready",
            DomainEvent::BlockPlace(_) => "block_place",
            DomainEvent::BlockBreak(_) => "block_break",
            DomainEvent::BlockUse(_) => "block_use",
            DomainEvent::WorldAdd(_) => "world_add",
            DomainEvent::WorldRemove(_) => "world_remove",
            DomainEvent::WorldStart(_) => "world_start",
            DomainEvent::ChunkLoad(_) => "chunk_load",
            DomainEvent::ChunkUnload(_) => "chunk_unload",
            DomainEvent::ServerBoot(_) => "server_boot",
            DomainEvent::ServerShutdown(_) => "server_shutdown",
            DomainEvent::ServerTick(_) => "server_tick",
        }
    }
}
