//! Periodic metric reader: collect every interval, export once, drop on failure.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::telemetry::export::MetricExporter;
use crate::telemetry::instruments::MetricProducer;

pub(crate) type Producers = Arc<RwLock<Vec<Arc<dyn MetricProducer>>>>;

pub(crate) enum ReaderCommand {
    /// Collect and export now, then acknowledge.
    Flush(SyncSender<()>),
    /// Final collect and export, shut the exporter down, acknowledge and exit.
    Shutdown(SyncSender<()>),
}

pub(crate) async fn run(
    exporter: Box<dyn MetricExporter>,
    producers: Producers,
    interval: Duration,
    timeout: Duration,
    mut commands: UnboundedReceiver<ReaderCommand>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                collect_and_export(exporter.as_ref(), &producers, timeout).await;
            }
            command = commands.recv() => match command {
                Some(ReaderCommand::Flush(ack)) => {
                    collect_and_export(exporter.as_ref(), &producers, timeout).await;
                    let _ = ack.send(());
                }
                Some(ReaderCommand::Shutdown(ack)) => {
                    collect_and_export(exporter.as_ref(), &producers, timeout).await;
                    if let Err(err) = exporter.shutdown().await {
                        warn!(error = %err, "Metric exporter shutdown failed");
                    }
                    let _ = ack.send(());
                    break;
                }
                None => break,
            }
        }
    }
    debug!("Metric reader stopped");
}

async fn collect_and_export(
    exporter: &dyn MetricExporter,
    producers: &Producers,
    timeout: Duration,
) {
    let producers: Vec<Arc<dyn MetricProducer>> = producers.read().clone();
    let metrics: Vec<_> = producers
        .iter()
        .flat_map(|producer| producer.produce())
        .collect();
    if metrics.is_empty() {
        trace!("No metrics to export this cycle");
        return;
    }

    let count = metrics.len();
    match tokio::time::timeout(timeout, exporter.export(metrics)).await {
        Ok(Ok(())) => trace!(metrics = count, "Exported metrics"),
        Ok(Err(err)) => warn!(metrics = count, error = %err, "Metric export failed, dropping cycle"),
        Err(_) => warn!(
            metrics = count,
            timeout_ms = timeout.as_millis() as u64,
            "Metric export timed out, dropping cycle"
        ),
    }
}
