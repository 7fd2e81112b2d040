//! Exporter Pipeline
//!
//! Owns a small tokio runtime that performs all network I/O, plus two background
//! tasks: the periodic metric reader and the batch span processor. Callers on
//! event-delivery threads only ever touch in-memory queues.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::PipelineError;
use crate::telemetry::export::{MetricExporter, SpanExporter, TransportFactory};
use crate::telemetry::instruments::MetricProducer;
use crate::telemetry::resource::Resource;
use crate::telemetry::trace::SpanProcessor;

mod batch;
mod reader;

pub use batch::BatchSpanProcessor;
use batch::BatchCommand;
use reader::{Producers, ReaderCommand};

/// Extra wait on top of the export timeout when waiting for a flush to be
/// acknowledged.
const ACK_GRACE: Duration = Duration::from_millis(500);

pub struct Pipeline {
    runtime: Mutex<Option<Runtime>>,
    producers: Producers,
    reader: Option<UnboundedSender<ReaderCommand>>,
    spans: Option<Arc<BatchSpanProcessor>>,
    export_timeout: Duration,
    shut_down: AtomicBool,
}

impl Pipeline {
    /// Build exporters through `transport` and start the background tasks for the
    /// enabled signals. Any construction failure is returned before a task starts.
    pub fn new(
        config: &TelemetryConfig,
        transport: &dyn TransportFactory,
    ) -> Result<Self, PipelineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("hotelc-export")
            .enable_all()
            .build()?;

        let resource = Resource::from_config(config);
        let export_timeout = config.exporter.timeout();
        let producers: Producers = Arc::new(RwLock::new(Vec::new()));

        // Exporters are built under the runtime context; lazy gRPC channels need it.
        let built = {
            let _guard = runtime.enter();
            build_exporters(config, transport, &resource)
        };
        let (metric_exporter, span_exporter) = match built {
            Ok(exporters) => exporters,
            Err(err) => {
                runtime.shutdown_background();
                return Err(err);
            }
        };

        let reader = metric_exporter.map(|exporter| {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            runtime.spawn(reader::run(
                exporter,
                producers.clone(),
                config.metrics.export_interval(),
                export_timeout,
                rx,
            ));
            tx
        });

        let spans = span_exporter.map(|exporter| {
            let batch_config = config.tracing.batch.clone();
            let (queue_tx, queue_rx) = tokio::sync::mpsc::channel(batch_config.max_queue_size);
            let (control_tx, control_rx) = tokio::sync::mpsc::unbounded_channel();
            runtime.spawn(batch::run(
                exporter,
                queue_rx,
                control_rx,
                batch_config,
                export_timeout,
            ));
            Arc::new(BatchSpanProcessor::new(queue_tx, control_tx))
        });

        info!(
            endpoint = %config.exporter.endpoint,
            protocol = %config.exporter.protocol,
            metrics = reader.is_some(),
            traces = spans.is_some(),
            "Exporter pipeline started"
        );

        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            producers,
            reader,
            spans,
            export_timeout,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Attach a metric source to the periodic reader.
    pub fn register_producer(&self, producer: Arc<dyn MetricProducer>) {
        self.producers.write().push(producer);
    }

    /// Span processor for the tracer, when tracing is enabled.
    pub fn span_processor(&self) -> Option<Arc<dyn SpanProcessor>> {
        self.spans
            .as_ref()
            .map(|spans| spans.clone() as Arc<dyn SpanProcessor>)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Export current metrics and every queued span now, waiting for both.
    pub fn force_flush(&self) -> Result<(), PipelineError> {
        if self.is_shut_down() {
            return Ok(());
        }
        let mut pending = Vec::new();
        if let Some(reader) = &self.reader {
            let (ack, done) = sync_channel(1);
            if reader.send(ReaderCommand::Flush(ack)).is_ok() {
                pending.push((done, "metric flush"));
            }
        }
        if let Some(spans) = &self.spans {
            let (ack, done) = sync_channel(1);
            if spans.send(BatchCommand::Flush(ack)) {
                pending.push((done, "span flush"));
            }
        }
        self.wait_all(pending)
    }

    /// Final export of both signals, then stop the runtime. Idempotent.
    pub fn shutdown(&self) -> Result<(), PipelineError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut pending = Vec::new();
        if let Some(reader) = &self.reader {
            let (ack, done) = sync_channel(1);
            if reader.send(ReaderCommand::Shutdown(ack)).is_ok() {
                pending.push((done, "metric reader shutdown"));
            }
        }
        if let Some(spans) = &self.spans {
            let (ack, done) = sync_channel(1);
            if spans.send(BatchCommand::Shutdown(ack)) {
                pending.push((done, "span processor shutdown"));
            }
        }
        let result = self.wait_all(pending);

        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
        let dropped_spans = self.spans.as_ref().map_or(0, |spans| spans.dropped_spans());
        info!(dropped_spans, "Exporter pipeline stopped");
        result
    }

    /// Wait for every acknowledgement, even after one times out, and report the
    /// first failure.
    fn wait_all(&self, pending: Vec<(Receiver<()>, &'static str)>) -> Result<(), PipelineError> {
        let wait = self.export_timeout + ACK_GRACE;
        let mut first_error = None;
        for (done, what) in pending {
            if done.recv_timeout(wait).is_err() {
                warn!(step = what, timeout_ms = wait.as_millis() as u64, "Pipeline step not acknowledged");
                first_error.get_or_insert(PipelineError::Timeout(wait, what));
            } else {
                debug!(step = what, "Pipeline step acknowledged");
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

type Exporters = (
    Option<Box<dyn MetricExporter>>,
    Option<Box<dyn SpanExporter>>,
);

fn build_exporters(
    config: &TelemetryConfig,
    transport: &dyn TransportFactory,
    resource: &Resource,
) -> Result<Exporters, PipelineError> {
    let metric_exporter = if config.metrics.enabled {
        Some(transport.metric_exporter(&config.exporter, resource)?)
    } else {
        None
    };
    let span_exporter = if config.tracing.enabled {
        Some(transport.span_exporter(&config.exporter, resource)?)
    } else {
        None
    };
    Ok((metric_exporter, span_exporter))
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
    }
}
