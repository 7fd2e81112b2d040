//! Engine lifecycle: initialize, shutdown and the server lifecycle span.

use std::sync::Arc;

use hotelc::events::{DomainEvent, PlayerSource, ServerBoot, ServerShutdown, WorldInfo};
use hotelc::recorders;
use hotelc::telemetry::export::InMemoryTransport;
use hotelc::telemetry::attributes::AttributeValue;
use hotelc::telemetry::trace::StatusCode;
use hotelc::{EngineError, EngineState, TelemetryEngine};

use crate::integration::test_utils::{player, quiet_config, running_engine};

#[test]
fn shutdown_is_idempotent() {
    let (engine, transport) = running_engine(quiet_config());
    engine.handle(&DomainEvent::PlayerConnect(player(1)));

    engine.shutdown();
    engine.shutdown();
    engine.shutdown();

    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(transport.spans().len(), 1);
    assert!(engine.force_flush().is_ok());
}

#[test]
fn events_after_shutdown_are_ignored() {
    let (engine, transport) = running_engine(quiet_config());
    engine.shutdown();
    let calls = transport.metric_export_calls();

    engine.handle(&DomainEvent::PlayerConnect(player(1)));
    engine.handle(&DomainEvent::PlayerDisconnect(player(1)));

    assert!(engine.context().is_none());
    assert_eq!(transport.metric_export_calls(), calls);
    assert!(transport.spans().is_empty());
}

#[test]
fn disabled_config_never_builds_a_pipeline() {
    let transport = InMemoryTransport::new();
    let engine = TelemetryEngine::with_transport(Arc::new(transport.clone()));
    let mut config = quiet_config();
    config.enabled = false;

    engine.initialize(config).unwrap();
    assert_eq!(engine.state(), EngineState::Stopped);
    engine.handle(&DomainEvent::PlayerConnect(player(1)));
    engine.shutdown();

    assert!(transport.resource().is_none());
    assert_eq!(transport.metric_export_calls(), 0);
    assert_eq!(transport.span_export_calls(), 0);
}

#[test]
fn invalid_endpoint_fails_initialize() {
    let transport = InMemoryTransport::new();
    let engine = TelemetryEngine::with_transport(Arc::new(transport));
    let mut config = quiet_config();
    config.exporter.endpoint = "not a url".to_string();

    let result = engine.initialize(config);
    assert!(matches!(result, Err(EngineError::Config(_))));
    assert_eq!(engine.state(), EngineState::Stopped);
    engine.shutdown();
}

#[test]
fn second_initialize_is_rejected() {
    let (engine, _transport) = running_engine(quiet_config());
    assert!(matches!(
        engine.initialize(quiet_config()),
        Err(EngineError::AlreadyInitialized)
    ));
    engine.shutdown();
    assert!(matches!(
        engine.initialize(quiet_config()),
        Err(EngineError::Stopped)
    ));
}

#[test]
fn shutdown_before_initialize_stops_the_engine() {
    let engine = TelemetryEngine::with_transport(Arc::new(InMemoryTransport::new()));
    engine.shutdown();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(engine.initialize(quiet_config()).is_err());
}

#[test]
fn server_lifecycle_span_records_boot_worlds_and_shutdown() {
    let (engine, transport) = running_engine(quiet_config());
    engine.handle(&DomainEvent::ServerBoot(ServerBoot {
        boot_time_ms: Some(1_000),
    }));
    engine.handle(&DomainEvent::WorldAdd(WorldInfo {
        name: Some("default".to_string()),
        id: None,
    }));
    engine.handle(&DomainEvent::ServerShutdown(ServerShutdown {
        shutdown_time_ms: Some(9_000),
    }));
    engine.shutdown();

    let spans = transport.spans();
    assert_eq!(spans.len(), 1);
    let lifecycle = &spans[0];
    assert_eq!(lifecycle.name, "server.lifecycle");
    assert_eq!(lifecycle.status.code, StatusCode::Ok);
    let names: Vec<_> = lifecycle.events.iter().map(|e| e.name.as_ref()).collect();
    assert_eq!(names, vec!["server.started", "world.loaded", "server.shutdown"]);

    let world_event = &lifecycle.events[1];
    assert_eq!(world_event.attributes.get_str("world.name"), Some("default"));
    assert!(world_event.attributes.get("world.id").is_none());
    assert!(lifecycle.end_unix_nano >= lifecycle.start_unix_nano);
}

#[test]
fn second_boot_does_not_open_another_span() {
    let (engine, transport) = running_engine(quiet_config());
    engine.handle(&DomainEvent::ServerBoot(ServerBoot::default()));
    engine.handle(&DomainEvent::ServerBoot(ServerBoot::default()));
    engine.shutdown();
    assert_eq!(transport.spans().len(), 1);
}

struct HostPlayer {
    id: String,
}

impl PlayerSource for HostPlayer {
    fn player_uuid(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn player_name(&self) -> Option<&str> {
        None
    }
}

#[test]
fn host_types_record_through_observe() {
    let (engine, transport) = running_engine(quiet_config());
    let host = HostPlayer {
        id: "host-uuid".to_string(),
    };
    engine.observe("player_connect", |ctx| recorders::player::connect(ctx, &host));
    engine.observe("player_disconnect", |ctx| {
        recorders::player::disconnect(ctx, &host)
    });
    engine.observe("boom", |_| panic!("recorder bug"));
    engine.shutdown();

    let spans = transport.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].attributes.get_str("player.uuid"), Some("host-uuid"));
    assert_eq!(spans[0].attributes.get_str("player.name"), Some("unknown"));
}

#[test]
fn shutdown_flushes_pending_metrics() {
    let (engine, transport) = running_engine(quiet_config());
    engine.handle(&DomainEvent::PlayerConnect(player(1)));
    assert_eq!(transport.metric_export_calls(), 0);
    engine.shutdown();
    assert!(transport.metric_export_calls() >= 1);
    assert!(transport.last_metric("hytale.players.connections").is_some());
    assert_eq!(transport.shutdown_calls(), 2);
}

#[test]
fn connect_delivered_during_shutdown_leaves_no_open_session() {
    let (engine, transport) = running_engine(quiet_config());
    engine.handle(&DomainEvent::PlayerConnect(player(1)));
    let context = engine.context().unwrap();

    engine.shutdown();
    // A delivery that cloned the context before shutdown finishes after it.
    recorders::dispatch(&context, &DomainEvent::PlayerConnect(player(2)));

    let sessions = context.sessions().unwrap();
    assert_eq!(sessions.open_count(), 0);
    assert_eq!(transport.spans().len(), 1);
}

#[test]
fn boot_and_shutdown_without_timestamps_are_stamped() {
    let (engine, transport) = running_engine(quiet_config());
    engine.handle(&DomainEvent::ServerBoot(ServerBoot::default()));
    engine.handle(&DomainEvent::ServerShutdown(ServerShutdown::default()));
    engine.shutdown();

    let spans = transport.spans();
    let events = &spans[0].events;
    let stamped = |event: usize, key: &str| match events[event].attributes.get(key) {
        Some(AttributeValue::Int(ms)) => *ms > 1_600_000_000_000,
        _ => false,
    };
    assert!(stamped(0, "boot.time_ms"));
    assert!(stamped(1, "shutdown.time_ms"));
}
