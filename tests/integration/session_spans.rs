//! Player session spans end to end through the engine.

use hotelc::events::{DomainEvent, PlayerInfo};
use hotelc::telemetry::attributes::AttributeValue;
use hotelc::telemetry::trace::StatusCode;

use crate::integration::test_utils::{block, player, quiet_config, running_engine};

#[test]
fn connect_then_disconnect_exports_one_ok_session() {
    let (engine, transport) = running_engine(quiet_config());
    let p1 = PlayerInfo::new("P1-uuid", "P1");
    engine.handle(&DomainEvent::PlayerConnect(p1.clone()));
    engine.handle(&DomainEvent::PlayerDisconnect(p1));
    engine.force_flush().unwrap();

    let spans = transport.spans();
    let sessions: Vec<_> = spans.iter().filter(|s| s.name == "player.session").collect();
    assert_eq!(sessions.len(), 1);
    let session = sessions[0];
    assert_eq!(session.attributes.get_str("player.uuid"), Some("P1-uuid"));
    assert_eq!(session.attributes.get_str("player.name"), Some("P1"));
    assert_eq!(session.status.code, StatusCode::Ok);
    assert!(session.end_unix_nano >= session.start_unix_nano);

    engine.shutdown();
    // Nothing exported twice on shutdown.
    assert_eq!(
        transport
            .spans()
            .iter()
            .filter(|s| s.name == "player.session")
            .count(),
        1
    );
}

#[test]
fn double_connect_exports_superseded_then_completed() {
    let (engine, transport) = running_engine(quiet_config());
    let p = player(1);
    engine.handle(&DomainEvent::PlayerConnect(p.clone()));
    engine.handle(&DomainEvent::PlayerConnect(p.clone()));
    engine.handle(&DomainEvent::PlayerDisconnect(p));
    engine.force_flush().unwrap();

    let spans = transport.spans();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].status.code, StatusCode::Error);
    assert_eq!(spans[0].status.message, "superseded");
    assert_eq!(
        spans[0].attributes.get("session.status"),
        Some(&AttributeValue::from("superseded"))
    );
    assert_eq!(spans[1].status.code, StatusCode::Ok);
    engine.shutdown();
}

#[test]
fn ready_without_session_records_nothing() {
    let (engine, transport) = running_engine(quiet_config());
    engine.handle(&DomainEvent::PlayerReady(player(9)));
    engine.force_flush().unwrap();
    assert!(transport.spans().is_empty());

    let context = engine.context().unwrap();
    assert_eq!(context.sessions().unwrap().open_count(), 0);
    engine.shutdown();
}

#[test]
fn ready_appends_event_to_open_session() {
    let (engine, transport) = running_engine(quiet_config());
    let p = player(2);
    engine.handle(&DomainEvent::PlayerConnect(p.clone()));
    engine.handle(&DomainEvent::PlayerReady(p.clone()));
    engine.handle(&DomainEvent::PlayerDisconnect(p));
    engine.force_flush().unwrap();

    let spans = transport.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].events.len(), 1);
    assert_eq!(spans[0].events[0].name, "player.ready");
    engine.shutdown();
}

#[test]
fn block_operations_trace_onto_the_actor_session_when_enabled() {
    let mut config = quiet_config();
    config.tracing.trace_block_operations = true;
    let (engine, transport) = running_engine(config);
    let p = player(3);
    engine.handle(&DomainEvent::PlayerConnect(p.clone()));
    engine.handle(&DomainEvent::BlockPlace(block("Rock_Stone", Some(p.clone()))));
    engine.handle(&DomainEvent::BlockBreak(block("Rock_Stone", Some(p.clone()))));
    engine.handle(&DomainEvent::BlockUse(block("Door", None)));
    engine.handle(&DomainEvent::PlayerDisconnect(p));
    engine.force_flush().unwrap();

    let spans = transport.spans();
    let names: Vec<_> = spans[0].events.iter().map(|e| e.name.as_ref()).collect();
    assert_eq!(names, vec!["block.placed", "block.broken"]);
    assert_eq!(
        spans[0].events[0].attributes.get_str("block.type"),
        Some("Rock_Stone")
    );
    engine.shutdown();
}

#[test]
fn block_operations_are_not_traced_by_default() {
    let (engine, transport) = running_engine(quiet_config());
    let p = player(4);
    engine.handle(&DomainEvent::PlayerConnect(p.clone()));
    engine.handle(&DomainEvent::BlockPlace(block("Rock_Stone", Some(p.clone()))));
    engine.handle(&DomainEvent::PlayerDisconnect(p));
    engine.force_flush().unwrap();
    assert!(transport.spans()[0].events.is_empty());
    engine.shutdown();
}

#[test]
fn shutdown_interrupts_open_sessions() {
    let (engine, transport) = running_engine(quiet_config());
    for i in 0..5 {
        engine.handle(&DomainEvent::PlayerConnect(player(i)));
    }
    engine.shutdown();

    let spans = transport.spans();
    assert_eq!(spans.len(), 5);
    assert!(spans.iter().all(|s| s.status.code == StatusCode::Ok
        && s.status.message == "Server shutdown"
        && s.attributes.get_str("session.status") == Some("interrupted")));
}

#[test]
fn session_tracing_off_opens_no_sessions() {
    let mut config = quiet_config();
    config.tracing.trace_player_sessions = false;
    let (engine, transport) = running_engine(config);
    engine.handle(&DomainEvent::PlayerConnect(player(1)));
    engine.handle(&DomainEvent::PlayerDisconnect(player(1)));
    engine.shutdown();
    assert!(transport.spans().is_empty());
}

#[test]
fn concurrent_players_each_get_one_session() {
    let (engine, transport) = running_engine(quiet_config());
    std::thread::scope(|scope| {
        for t in 0..4 {
            let engine = &engine;
            scope.spawn(move || {
                for i in 0..25 {
                    let p = player(t * 100 + i);
                    engine.handle(&DomainEvent::PlayerConnect(p.clone()));
                    engine.handle(&DomainEvent::PlayerReady(p.clone()));
                    engine.handle(&DomainEvent::PlayerDisconnect(p));
                }
            });
        }
    });
    engine.shutdown();
    let spans = transport.spans();
    assert_eq!(spans.len(), 100);
    assert!(spans.iter().all(|s| s.events.len() == 1));
}
