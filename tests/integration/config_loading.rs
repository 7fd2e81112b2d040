//! Integration tests for layered configuration loading

use hotelc::config::{Compression, ConfigLoader, EnvVars, Protocol, ReopenPolicy, TelemetryConfig};
use hotelc::error::ConfigError;
use tempfile::TempDir;

#[test]
fn toml_file_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("hotelc.toml");
    std::fs::write(
        &config_file,
        r#"
[service]
name = "survival-eu"

[exporter]
endpoint = "http://collector.internal:4318"
protocol = "http"
compression = "gzip"
timeout_ms = 2500

[metrics]
export_interval_ms = 15000

[metrics.block]
track_placement = false

[metrics.world]
track_chunk_loading = true

[tracing]
sample_rate = 0.25
session_reopen_policy = "overwrite"

[resource_attributes]
region = "eu-west"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new().with_file(&config_file).load().unwrap();
    assert_eq!(config.service.name, "survival-eu");
    assert_eq!(config.service.namespace, "hytale");
    assert_eq!(config.exporter.endpoint, "http://collector.internal:4318");
    assert_eq!(config.exporter.protocol, Protocol::Http);
    assert_eq!(config.exporter.compression, Compression::Gzip);
    assert_eq!(config.exporter.timeout_ms, 2500);
    assert_eq!(config.metrics.export_interval_ms, 15000);
    assert!(!config.metrics.block.track_placement);
    assert!(config.metrics.block.track_breaking);
    assert!(config.metrics.world.track_chunk_loading);
    assert_eq!(config.tracing.sample_rate, 0.25);
    assert_eq!(config.tracing.session_reopen_policy, ReopenPolicy::Overwrite);
    assert_eq!(
        config.resource_attributes.get("region").map(String::as_str),
        Some("eu-west")
    );
}

#[test]
fn json_file_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("hotelc.json");
    std::fs::write(
        &config_file,
        r#"{ "enabled": true, "tracing": { "enabled": false }, "metrics": { "server": { "track_memory": false } } }"#,
    )
    .unwrap();

    let config = ConfigLoader::new().with_file(&config_file).load().unwrap();
    assert!(!config.tracing.enabled);
    assert!(!config.metrics.server.track_memory);
    assert!(config.metrics.server.track_tps);
}

#[test]
fn environment_beats_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("hotelc.toml");
    std::fs::write(
        &config_file,
        r#"
[service]
name = "from-file"

[exporter]
endpoint = "http://file:4317"
"#,
    )
    .unwrap();

    let env = EnvVars::from_pairs([
        ("OTEL_SERVICE_NAME", "from-env"),
        ("HOTELC__TRACING__SAMPLE_RATE", "0.5"),
    ]);
    let config = ConfigLoader::new()
        .with_file(&config_file)
        .with_env(env)
        .load()
        .unwrap();
    assert_eq!(config.service.name, "from-env");
    assert_eq!(config.exporter.endpoint, "http://file:4317");
    assert_eq!(config.tracing.sample_rate, 0.5);
}

#[test]
fn invalid_endpoint_in_file_fails_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("hotelc.toml");
    std::fs::write(
        &config_file,
        r#"
[exporter]
endpoint = "not a url"
"#,
    )
    .unwrap();

    let result = ConfigLoader::new().with_file(&config_file).load();
    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            field: "exporter.endpoint",
            ..
        })
    ));
}

#[test]
fn unsupported_protocol_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("hotelc.toml");
    std::fs::write(
        &config_file,
        r#"
[exporter]
protocol = "carrier-pigeon"
"#,
    )
    .unwrap();

    assert!(ConfigLoader::new().with_file(&config_file).load().is_err());
}

#[test]
fn malformed_file_is_a_load_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("hotelc.toml");
    std::fs::write(&config_file, "[service\nname = ").unwrap();

    let result = ConfigLoader::new().with_file(&config_file).load();
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn empty_environment_yields_defaults() {
    let config = ConfigLoader::new()
        .with_env(EnvVars::from_pairs(Vec::<(String, String)>::new()))
        .load()
        .unwrap();
    assert_eq!(config, TelemetryConfig::default());
}
