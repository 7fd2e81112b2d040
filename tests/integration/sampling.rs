//! Trace sampling as seen from the exporter.

use hotelc::events::DomainEvent;

use crate::integration::test_utils::{player, quiet_config, running_engine};

fn sessions_exported(sample_rate: f64, players: usize) -> usize {
    let mut config = quiet_config();
    config.tracing.sample_rate = sample_rate;
    let (engine, transport) = running_engine(config);
    for i in 0..players {
        engine.handle(&DomainEvent::PlayerConnect(player(i)));
        engine.handle(&DomainEvent::PlayerDisconnect(player(i)));
    }
    engine.shutdown();
    transport
        .spans()
        .iter()
        .filter(|s| s.name == "player.session")
        .count()
}

#[test]
fn rate_zero_exports_no_spans() {
    assert_eq!(sessions_exported(0.0, 50), 0);
}

#[test]
fn rate_one_exports_every_span() {
    assert_eq!(sessions_exported(1.0, 50), 50);
}

#[test]
fn out_of_range_rates_are_clamped() {
    assert_eq!(sessions_exported(-3.0, 20), 0);
    assert_eq!(sessions_exported(7.5, 20), 20);
}

#[test]
fn half_rate_exports_roughly_half() {
    let exported = sessions_exported(0.5, 2_000);
    assert!((700..=1_300).contains(&exported), "exported {exported}");
}

#[test]
fn unsampled_sessions_still_count_metrics() {
    let mut config = quiet_config();
    config.tracing.sample_rate = 0.0;
    let (engine, transport) = running_engine(config);
    engine.handle(&DomainEvent::PlayerConnect(player(1)));
    engine.shutdown();

    assert!(transport.spans().is_empty());
    assert!(transport.last_metric("hytale.players.connections").is_some());
}
