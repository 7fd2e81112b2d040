//! Shared test utilities for integration tests
//!
//! Builds engines over the in-memory transport with timers long enough that
//! exports only happen on explicit flush or shutdown.

use std::sync::Arc;

use hotelc::config::TelemetryConfig;
use hotelc::events::{BlockInfo, BlockPos, PlayerInfo};
use hotelc::telemetry::export::InMemoryTransport;
use hotelc::telemetry::instruments::{MetricData, MetricPoints, NumberValue};
use hotelc::TelemetryEngine;

/// Defaults with the periodic timers pushed out of the way.
pub fn quiet_config() -> TelemetryConfig {
    let mut config = TelemetryConfig::default();
    config.metrics.export_interval_ms = 3_600_000;
    config.tracing.batch.scheduled_delay_ms = 3_600_000;
    config.exporter.timeout_ms = 2_000;
    config
}

/// Running engine over a fresh in-memory transport.
pub fn running_engine(config: TelemetryConfig) -> (TelemetryEngine, InMemoryTransport) {
    let transport = InMemoryTransport::new();
    let engine = TelemetryEngine::with_transport(Arc::new(transport.clone()));
    engine.initialize(config).unwrap();
    (engine, transport)
}

pub fn player(index: usize) -> PlayerInfo {
    PlayerInfo::new(format!("P{index}-uuid"), format!("P{index}"))
}

pub fn block(kind: &str, actor: Option<PlayerInfo>) -> BlockInfo {
    BlockInfo {
        block_type: Some(kind.to_string()),
        position: Some(BlockPos { x: 1, y: 64, z: -3 }),
        world: Some("default".to_string()),
        player: actor,
    }
}

/// Sum of every integer point of a metric.
pub fn int_total(metric: &MetricData) -> i64 {
    let points = match &metric.points {
        MetricPoints::Sum { points, .. } | MetricPoints::Gauge { points } => points,
    };
    points
        .iter()
        .map(|p| match p.value {
            NumberValue::Int(v) => v,
            NumberValue::Double(v) => v as i64,
        })
        .sum()
}
