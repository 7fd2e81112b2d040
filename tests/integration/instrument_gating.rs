//! Instruments exist only when their category and sub-flag are enabled.

use hotelc::events::{ChunkInfo, DomainEvent, ServerTick, WorldInfo};
use hotelc::telemetry::instruments::{InstrumentId, MetricPoints, NumberValue};

use crate::integration::test_utils::{block, int_total, player, quiet_config, running_engine};

#[test]
fn placement_off_breaking_on_counts_only_breaks() {
    let mut config = quiet_config();
    config.metrics.block.track_breaking = true;
    config.metrics.block.track_placement = false;
    let (engine, transport) = running_engine(config);

    engine.handle(&DomainEvent::BlockPlace(block("Rock_Stone", None)));
    engine.handle(&DomainEvent::BlockBreak(block("Rock_Stone", None)));
    engine.force_flush().unwrap();

    assert!(transport.last_metric("hytale.blocks.placed").is_none());
    let broken = transport.last_metric("hytale.blocks.broken").unwrap();
    assert_eq!(int_total(&broken), 1);

    let context = engine.context().unwrap();
    assert!(!context.instruments().is_enabled(InstrumentId::BlocksPlaced));
    engine.shutdown();
}

#[test]
fn disabled_categories_export_nothing() {
    let mut config = quiet_config();
    config.metrics.player.enabled = false;
    config.metrics.block.enabled = false;
    config.metrics.world.enabled = false;
    config.metrics.server.enabled = false;
    config.tracing.enabled = false;
    let (engine, transport) = running_engine(config);

    engine.handle(&DomainEvent::PlayerConnect(player(1)));
    engine.handle(&DomainEvent::BlockPlace(block("Rock_Stone", None)));
    engine.handle(&DomainEvent::WorldAdd(WorldInfo::default()));
    engine.handle(&DomainEvent::ServerTick(ServerTick { tps: 20.0 }));
    engine.force_flush().unwrap();
    engine.shutdown();

    assert_eq!(transport.metric_export_calls(), 0);
    assert_eq!(transport.span_export_calls(), 0);
}

#[test]
fn metrics_master_switch_disables_every_instrument() {
    let mut config = quiet_config();
    config.metrics.enabled = false;
    let (engine, transport) = running_engine(config);
    let context = engine.context().unwrap();
    assert_eq!(context.instruments().enabled_count(), 0);
    engine.handle(&DomainEvent::BlockBreak(block("Rock_Stone", None)));
    engine.shutdown();
    assert_eq!(transport.metric_export_calls(), 0);
}

#[test]
fn player_count_goes_up_and_down() {
    let (engine, transport) = running_engine(quiet_config());
    for i in 0..3 {
        engine.handle(&DomainEvent::PlayerConnect(player(i)));
    }
    engine.handle(&DomainEvent::PlayerDisconnect(player(0)));
    engine.force_flush().unwrap();

    let online = transport.last_metric("hytale.players.count").unwrap();
    assert_eq!(int_total(&online), 2);
    assert!(matches!(
        online.points,
        MetricPoints::Sum {
            monotonic: false,
            ..
        }
    ));
    assert_eq!(
        int_total(&transport.last_metric("hytale.players.connections").unwrap()),
        3
    );
    assert_eq!(
        int_total(&transport.last_metric("hytale.players.disconnections").unwrap()),
        1
    );
    engine.shutdown();
}

#[test]
fn chunk_counters_follow_their_flag() {
    let mut config = quiet_config();
    config.metrics.world.track_chunk_loading = true;
    let (engine, transport) = running_engine(config);
    let chunk = ChunkInfo {
        world: Some("default".to_string()),
        x: Some(4),
        z: Some(-7),
    };
    engine.handle(&DomainEvent::ChunkLoad(chunk.clone()));
    engine.handle(&DomainEvent::ChunkLoad(chunk.clone()));
    engine.handle(&DomainEvent::ChunkUnload(chunk));
    engine.force_flush().unwrap();

    assert_eq!(
        int_total(&transport.last_metric("hytale.chunks.loaded").unwrap()),
        2
    );
    assert_eq!(
        int_total(&transport.last_metric("hytale.chunks.unloaded").unwrap()),
        1
    );
    engine.shutdown();
}

#[test]
fn tps_gauge_reports_last_tick() {
    let (engine, transport) = running_engine(quiet_config());
    engine.handle(&DomainEvent::ServerTick(ServerTick { tps: 18.0 }));
    engine.handle(&DomainEvent::ServerTick(ServerTick { tps: 19.5 }));
    engine.force_flush().unwrap();

    let tps = transport.last_metric("hytale.server.tps").unwrap();
    match tps.points {
        MetricPoints::Gauge { points } => {
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].value, NumberValue::Double(19.5));
        }
        other => panic!("expected a gauge, got {other:?}"),
    }
    assert!(transport.last_metric("hytale.server.uptime").is_some());
    engine.shutdown();
}

#[test]
fn world_events_count_and_mark_the_lifecycle_span() {
    let (engine, transport) = running_engine(quiet_config());
    engine.handle(&DomainEvent::ServerBoot(Default::default()));
    let world = WorldInfo {
        name: Some("default".to_string()),
        id: Some("w-1".to_string()),
    };
    engine.handle(&DomainEvent::WorldAdd(world.clone()));
    engine.handle(&DomainEvent::WorldStart(world.clone()));
    engine.handle(&DomainEvent::WorldRemove(world));
    engine.shutdown();

    assert_eq!(
        int_total(&transport.last_metric("hytale.worlds.loaded").unwrap()),
        1
    );
    let spans = transport.spans();
    let lifecycle = spans
        .iter()
        .find(|s| s.name == "server.lifecycle")
        .unwrap();
    let names: Vec<_> = lifecycle.events.iter().map(|e| e.name.as_ref()).collect();
    assert_eq!(names, vec!["server.started", "world.loaded", "world.unloaded"]);
}

#[test]
fn metrics_carry_the_resource() {
    let mut config = quiet_config();
    config.service.name = "lobby".to_string();
    config
        .resource_attributes
        .insert("region".to_string(), "eu-west".to_string());
    let (engine, transport) = running_engine(config);
    engine.shutdown();

    let resource = transport.resource().unwrap();
    assert_eq!(resource.attributes().get_str("service.name"), Some("lobby"));
    assert_eq!(resource.attributes().get_str("region"), Some("eu-west"));
}
