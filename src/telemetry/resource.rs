//! Resource: the attributes describing the emitting process, sent with every batch.

use crate::config::TelemetryConfig;
use crate::telemetry::attributes::{keys, AttributeSet};

pub const SDK_NAME: &str = "hotelc";
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    attributes: AttributeSet,
}

impl Resource {
    /// Service identity, SDK identity, then every configured resource attribute.
    /// Configured keys override the built-in ones.
    pub fn from_config(config: &TelemetryConfig) -> Self {
        let mut attributes = AttributeSet::with_capacity(6 + config.resource_attributes.len())
            .with(keys::SERVICE_NAME, config.service.name.clone())
            .with(keys::SERVICE_NAMESPACE, config.service.namespace.clone())
            .with(keys::SERVICE_VERSION, config.service.version.clone())
            .with(keys::SDK_NAME, SDK_NAME)
            .with(keys::SDK_LANGUAGE, "rust")
            .with(keys::SDK_VERSION, SDK_VERSION);
        for (key, value) in &config.resource_attributes {
            attributes.insert(key.clone(), value.clone());
        }
        Self { attributes }
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}
