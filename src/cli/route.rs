//! CLI route: run context and command dispatch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use tracing::info;

use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, TelemetryConfig};
use crate::engine::TelemetryEngine;
use crate::events::{
    BlockInfo, BlockPos, DomainEvent, PlayerInfo, ServerBoot, ServerShutdown, ServerTick,
    WorldInfo,
};
use crate::telemetry::export::{InMemoryTransport, OtlpTransport, TransportFactory};

/// Loaded configuration plus where it came from.
pub struct RunContext {
    config: TelemetryConfig,
    config_path: Option<PathBuf>,
}

impl RunContext {
    /// Load configuration from the given file (or the per-user default) and the
    /// process environment.
    pub fn new(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut loader = ConfigLoader::from_process();
        if let Some(path) = &config_path {
            loader = loader.with_file(path);
        }
        let config = loader.load().context("loading telemetry configuration")?;
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn from_config(config: TelemetryConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        match command {
            Commands::Check { format } => self.check(format),
            Commands::Simulate {
                players,
                blocks,
                dry_run,
            } => self.simulate(*players, *blocks, *dry_run),
        }
    }

    fn check(&self, format: &str) -> anyhow::Result<String> {
        self.config.validate()?;
        let rendered = match format {
            "toml" => toml::to_string_pretty(&self.config)?,
            "json" => serde_json::to_string_pretty(&self.config)?,
            other => bail!("Unsupported output format: {other} (must be 'toml' or 'json')"),
        };
        let source = self
            .config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults and environment".to_string());
        Ok(format!("# configuration is valid (source: {source})\n{rendered}"))
    }

    fn simulate(&self, players: usize, blocks: usize, dry_run: bool) -> anyhow::Result<String> {
        let memory = InMemoryTransport::new();
        let transport: Arc<dyn TransportFactory> = if dry_run {
            Arc::new(memory.clone())
        } else {
            Arc::new(OtlpTransport)
        };
        let engine = TelemetryEngine::with_transport(transport);
        engine
            .initialize(self.config.clone())
            .context("initializing telemetry engine")?;

        let started = Instant::now();
        let mut delivered = 0usize;
        let mut deliver = |event: DomainEvent| {
            engine.handle(&event);
            delivered += 1;
        };

        deliver(DomainEvent::ServerBoot(ServerBoot {
            boot_time_ms: Some(0),
        }));
        deliver(DomainEvent::WorldAdd(WorldInfo {
            name: Some("default".to_string()),
            id: Some("0".to_string()),
        }));
        for index in 0..players {
            let player = PlayerInfo::new(format!("sim-player-{index}"), format!("Player{index}"));
            deliver(DomainEvent::PlayerConnect(player.clone()));
            deliver(DomainEvent::PlayerReady(player.clone()));
            for block in 0..blocks {
                let info = BlockInfo {
                    block_type: Some("Rock_Stone".to_string()),
                    position: Some(BlockPos {
                        x: index as i64,
                        y: 64,
                        z: block as i64,
                    }),
                    world: Some("default".to_string()),
                    player: Some(player.clone()),
                };
                deliver(DomainEvent::BlockPlace(info.clone()));
                deliver(DomainEvent::BlockBreak(info));
            }
            deliver(DomainEvent::ServerTick(ServerTick { tps: 20.0 }));
            deliver(DomainEvent::PlayerDisconnect(player));
        }
        deliver(DomainEvent::ServerShutdown(ServerShutdown {
            shutdown_time_ms: Some(0),
        }));
        let elapsed = started.elapsed();

        engine.shutdown();
        info!(events = delivered, "Simulation complete");

        let mut summary = format!(
            "Delivered {delivered} events in {:.3} ms",
            elapsed.as_secs_f64() * 1000.0
        );
        if dry_run {
            summary.push_str(&format!(
                "\nExported {} spans in {} calls, {} metric export calls",
                memory.spans().len(),
                memory.span_export_calls(),
                memory.metric_export_calls()
            ));
        }
        Ok(summary)
    }
}
