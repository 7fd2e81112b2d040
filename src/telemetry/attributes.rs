//! Typed key/value attributes attached to metric points, spans and span events.
//!
//! Values are never null: absent data is left out of the set.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

pub type Key = Cow<'static, str>;

/// Well-known attribute keys.
pub mod keys {
    pub const PLAYER_UUID: &str = "player.uuid";
    pub const PLAYER_NAME: &str = "player.name";
    pub const BLOCK_TYPE: &str = "block.type";
    pub const BLOCK_X: &str = "block.x";
    pub const BLOCK_Y: &str = "block.y";
    pub const BLOCK_Z: &str = "block.z";
    pub const WORLD_NAME: &str = "world.name";
    pub const WORLD_ID: &str = "world.id";
    pub const CHUNK_X: &str = "chunk.x";
    pub const CHUNK_Z: &str = "chunk.z";
    pub const EVENT_TYPE: &str = "event.type";
    pub const BOOT_TIME_MS: &str = "boot.time_ms";
    pub const SHUTDOWN_TIME_MS: &str = "shutdown.time_ms";
    pub const SERVER_UPTIME_MS: &str = "server.uptime_ms";
    pub const SESSION_STATUS: &str = "session.status";
    pub const SESSION_DURATION_MS: &str = "session.duration_ms";
    pub const SERVICE_NAME: &str = "service.name";
    pub const SERVICE_NAMESPACE: &str = "service.namespace";
    pub const SERVICE_VERSION: &str = "service.version";
    pub const SDK_NAME: &str = "telemetry.sdk.name";
    pub const SDK_LANGUAGE: &str = "telemetry.sdk.language";
    pub const SDK_VERSION: &str = "telemetry.sdk.version";
    pub const METRIC_OVERFLOW: &str = "otel.metric.overflow";
}

/// Sentinel for identity strings the event payload did not supply.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone)]
pub enum AttributeValue {
    String(Cow<'static, str>),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::String(a), AttributeValue::String(b)) => a == b,
            (AttributeValue::Int(a), AttributeValue::Int(b)) => a == b,
            (AttributeValue::Double(a), AttributeValue::Double(b)) => a.to_bits() == b.to_bits(),
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttributeValue {}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            AttributeValue::String(s) => s.hash(state),
            AttributeValue::Int(i) => i.hash(state),
            AttributeValue::Double(d) => d.to_bits().hash(state),
            AttributeValue::Bool(b) => b.hash(state),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Double(d) => write!(f, "{d}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&'static str> for AttributeValue {
    fn from(value: &'static str) -> Self {
        AttributeValue::String(Cow::Borrowed(value))
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(Cow::Owned(value))
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(i64::from(value))
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValue {
    pub key: Key,
    pub value: AttributeValue,
}

impl KeyValue {
    pub fn new(key: impl Into<Key>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered attribute collection with unique keys.
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributeSet {
    entries: Vec<KeyValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|kv| kv.key == key) {
            Some(existing) => existing.value = value,
            None => self.entries.push(KeyValue { key, value }),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<Key>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert only when a value is present.
    pub fn with_opt<V: Into<AttributeValue>>(self, key: impl Into<Key>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn extend(&mut self, other: &AttributeSet) {
        for kv in &other.entries {
            self.insert(kv.key.clone(), kv.value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| &kv.value)
    }

    /// String value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(AttributeValue::String(s)) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key-sorted copy, so sets with the same pairs aggregate together.
    pub fn canonical(&self) -> AttributeSet {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        AttributeSet { entries }
    }
}

impl FromIterator<KeyValue> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = KeyValue>>(iter: T) -> Self {
        let mut set = AttributeSet::new();
        for kv in iter {
            set.insert(kv.key, kv.value);
        }
        set
    }
}

/// Identity string or the `"unknown"` sentinel.
pub fn identity_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => UNKNOWN.to_string(),
    }
}
