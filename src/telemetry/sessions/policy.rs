//! Session policy: keys, close statuses and their span status mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::telemetry::trace::SpanStatus;

pub const SESSION_SPAN_NAME: &str = "player.session";

/// Stable identity of a session owner (a player's uuid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a session span was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Disconnect received.
    Completed,
    /// A newer session opened for the same key.
    Superseded,
    /// Force-closed during shutdown.
    Interrupted,
    Failed(String),
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "completed",
            SessionStatus::Superseded => "superseded",
            SessionStatus::Interrupted => "interrupted",
            SessionStatus::Failed(_) => "failed",
        }
    }

    pub fn span_status(&self) -> SpanStatus {
        match self {
            SessionStatus::Completed => SpanStatus::ok(),
            SessionStatus::Superseded => SpanStatus::error("superseded"),
            SessionStatus::Interrupted => SpanStatus::ok_with("Server shutdown"),
            SessionStatus::Failed(reason) => SpanStatus::error(reason.clone()),
        }
    }
}
