//! A collector that never answers must not slow down or crash the host.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hotelc::config::{Compression, Protocol};
use hotelc::events::DomainEvent;
use hotelc::telemetry::export::OtlpTransport;
use hotelc::{EngineState, TelemetryEngine};

use crate::integration::test_utils::{block, player, quiet_config};

fn run_against_closed_port(protocol: Protocol, compression: Compression) {
    let mut config = quiet_config();
    config.exporter.endpoint = "http://127.0.0.1:1".to_string();
    config.exporter.protocol = protocol;
    config.exporter.compression = compression;
    config.exporter.timeout_ms = 200;
    config.metrics.export_interval_ms = 50;
    config.tracing.batch.scheduled_delay_ms = 50;

    let engine = TelemetryEngine::with_transport(Arc::new(OtlpTransport));
    engine.initialize(config).unwrap();

    let started = Instant::now();
    for i in 0..100 {
        let p = player(i);
        engine.handle(&DomainEvent::PlayerConnect(p.clone()));
        engine.handle(&DomainEvent::BlockPlace(block("Rock_Stone", Some(p.clone()))));
        engine.handle(&DomainEvent::PlayerDisconnect(p));
    }
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "recording took {:?}",
        started.elapsed()
    );

    // Let a few export cycles fail.
    std::thread::sleep(Duration::from_millis(300));

    let started = Instant::now();
    engine.shutdown();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "shutdown took {:?}",
        started.elapsed()
    );
}

#[test]
fn grpc_collector_down() {
    run_against_closed_port(Protocol::Grpc, Compression::None);
}

#[test]
fn http_collector_down() {
    run_against_closed_port(Protocol::Http, Compression::None);
}

#[test]
fn gzip_http_collector_down() {
    run_against_closed_port(Protocol::Http, Compression::Gzip);
}

#[test]
fn force_flush_with_collector_down_returns() {
    let mut config = quiet_config();
    config.exporter.endpoint = "http://127.0.0.1:1".to_string();
    config.exporter.timeout_ms = 200;
    let engine = TelemetryEngine::with_transport(Arc::new(OtlpTransport));
    engine.initialize(config).unwrap();
    engine.handle(&DomainEvent::PlayerConnect(player(1)));

    let started = Instant::now();
    let _ = engine.force_flush();
    assert!(started.elapsed() < Duration::from_secs(5));
    engine.shutdown();
}
