//! Integration tests for the hotelc commands: check and simulate.

use clap::Parser;
use hotelc::cli::{map_error, Cli, Commands, RunContext};
use tempfile::TempDir;

use crate::integration::test_utils::quiet_config;

#[test]
fn test_parse_simulate_with_global_flags() {
    let cli = Cli::try_parse_from([
        "hotelc",
        "simulate",
        "--players",
        "5",
        "--dry-run",
        "--log-level",
        "debug",
    ])
    .unwrap();
    assert_eq!(cli.log_level.as_deref(), Some("debug"));
    match cli.command {
        Commands::Simulate {
            players,
            blocks,
            dry_run,
        } => {
            assert_eq!(players, 5);
            assert_eq!(blocks, 10);
            assert!(dry_run);
        }
        _ => panic!("expected simulate"),
    }
}

#[test]
fn test_parse_rejects_unknown_command() {
    assert!(Cli::try_parse_from(["hotelc", "explode"]).is_err());
}

#[test]
fn test_check_reads_explicit_file_as_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("hotelc.toml");
    std::fs::write(
        &config_file,
        r#"
[service]
name = "creative-1"
"#,
    )
    .unwrap();

    let ctx = RunContext::new(Some(config_file.clone())).unwrap();
    let out = ctx
        .execute(&Commands::Check {
            format: "json".to_string(),
        })
        .unwrap();
    assert!(out.contains("configuration is valid"));
    assert!(out.contains(&config_file.display().to_string()));
    assert!(out.contains("\"name\": \"creative-1\""));
}

#[test]
fn test_missing_config_file_maps_to_readable_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");
    let err = RunContext::new(Some(missing)).err().unwrap();
    let message = map_error(&err);
    assert!(message.contains("loading telemetry configuration"), "{message}");
    assert!(message.contains("absent.toml"), "{message}");
}

#[test]
fn test_dry_run_reports_exports() {
    let ctx = RunContext::from_config(quiet_config());
    let out = ctx
        .execute(&Commands::Simulate {
            players: 4,
            blocks: 2,
            dry_run: true,
        })
        .unwrap();
    // Four player sessions plus the server lifecycle span.
    assert!(out.contains("Exported 5 spans"), "{out}");
    assert!(out.contains("metric export calls"), "{out}");
}

#[test]
fn test_simulate_with_telemetry_disabled() {
    let mut config = quiet_config();
    config.enabled = false;
    let ctx = RunContext::from_config(config);
    let out = ctx
        .execute(&Commands::Simulate {
            players: 1,
            blocks: 1,
            dry_run: true,
        })
        .unwrap();
    assert!(out.contains("Exported 0 spans"), "{out}");
}
