//! Batch span processor: ended spans queue up and are exported in batches when
//! the batch fills, when the scheduled delay elapses, or on flush and shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::SyncSender;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::config::BatchConfig;
use crate::telemetry::export::SpanExporter;
use crate::telemetry::trace::{FinishedSpan, SpanProcessor};

pub(crate) enum BatchCommand {
    Flush(SyncSender<()>),
    Shutdown(SyncSender<()>),
}

/// Producer side of the span queue. Never blocks the caller ending a span.
pub struct BatchSpanProcessor {
    queue: Sender<FinishedSpan>,
    control: UnboundedSender<BatchCommand>,
    dropped: AtomicU64,
}

impl BatchSpanProcessor {
    pub(crate) fn new(
        queue: Sender<FinishedSpan>,
        control: UnboundedSender<BatchCommand>,
    ) -> Self {
        Self {
            queue,
            control,
            dropped: AtomicU64::new(0),
        }
    }

    /// Spans dropped because the queue was full.
    pub fn dropped_spans(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn send(&self, command: BatchCommand) -> bool {
        self.control.send(command).is_ok()
    }
}

impl SpanProcessor for BatchSpanProcessor {
    fn on_end(&self, span: FinishedSpan) {
        match self.queue.try_send(span) {
            Ok(()) => {}
            Err(TrySendError::Full(span)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 1000 == 0 {
                    warn!(
                        dropped,
                        span = %span.name,
                        "Span queue full, dropping spans"
                    );
                }
            }
            Err(TrySendError::Closed(span)) => {
                debug!(span = %span.name, "Span ended after the trace pipeline shut down");
            }
        }
    }
}

pub(crate) async fn run(
    exporter: Box<dyn SpanExporter>,
    mut queue: Receiver<FinishedSpan>,
    mut commands: UnboundedReceiver<BatchCommand>,
    config: BatchConfig,
    timeout: Duration,
) {
    let max_batch = config.max_export_batch_size;
    let mut batch: Vec<FinishedSpan> = Vec::with_capacity(max_batch);
    let mut ticker = tokio::time::interval(config.scheduled_delay());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            span = queue.recv() => match span {
                Some(span) => {
                    batch.push(span);
                    if batch.len() >= max_batch {
                        export(exporter.as_ref(), &mut batch, max_batch, timeout).await;
                    }
                }
                None => {
                    export(exporter.as_ref(), &mut batch, max_batch, timeout).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                export(exporter.as_ref(), &mut batch, max_batch, timeout).await;
            }
            command = commands.recv() => match command {
                Some(BatchCommand::Flush(ack)) => {
                    while let Ok(span) = queue.try_recv() {
                        batch.push(span);
                    }
                    export(exporter.as_ref(), &mut batch, max_batch, timeout).await;
                    let _ = ack.send(());
                }
                Some(BatchCommand::Shutdown(ack)) => {
                    queue.close();
                    while let Some(span) = queue.recv().await {
                        batch.push(span);
                    }
                    export(exporter.as_ref(), &mut batch, max_batch, timeout).await;
                    if let Err(err) = exporter.shutdown().await {
                        warn!(error = %err, "Span exporter shutdown failed");
                    }
                    let _ = ack.send(());
                    break;
                }
                None => break,
            }
        }
    }
    debug!("Batch span processor stopped");
}

/// Export everything buffered, `max_batch` spans per call. Failed batches are
/// dropped.
async fn export(
    exporter: &dyn SpanExporter,
    batch: &mut Vec<FinishedSpan>,
    max_batch: usize,
    timeout: Duration,
) {
    while !batch.is_empty() {
        let take = batch.len().min(max_batch);
        let chunk: Vec<FinishedSpan> = batch.drain(..take).collect();
        let count = chunk.len();
        match tokio::time::timeout(timeout, exporter.export(chunk)).await {
            Ok(Ok(())) => trace!(spans = count, "Exported spans"),
            Ok(Err(err)) => warn!(spans = count, error = %err, "Span export failed, dropping batch"),
            Err(_) => warn!(
                spans = count,
                timeout_ms = timeout.as_millis() as u64,
                "Span export timed out, dropping batch"
            ),
        }
    }
}
