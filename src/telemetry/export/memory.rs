//! In-memory transport recording every export call, for tests and local demos.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::ExporterConfig;
use crate::error::{ExportError, PipelineError};
use crate::telemetry::export::{MetricExporter, SpanExporter, TransportFactory};
use crate::telemetry::instruments::MetricData;
use crate::telemetry::resource::Resource;
use crate::telemetry::trace::FinishedSpan;

#[derive(Default)]
struct Recorded {
    metric_batches: Mutex<Vec<Vec<MetricData>>>,
    span_batches: Mutex<Vec<Vec<FinishedSpan>>>,
    resource: Mutex<Option<Resource>>,
    failing: AtomicBool,
    failed_calls: AtomicUsize,
    shutdowns: AtomicUsize,
}

/// Cloneable handle; every clone sees the same recorded calls.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    recorded: Arc<Recorded>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent export fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.recorded.failing.store(failing, Ordering::SeqCst);
    }

    pub fn metric_batches(&self) -> Vec<Vec<MetricData>> {
        self.recorded.metric_batches.lock().clone()
    }

    pub fn metric_export_calls(&self) -> usize {
        self.recorded.metric_batches.lock().len()
    }

    /// Latest exported snapshot of one metric, by name.
    pub fn last_metric(&self, name: &str) -> Option<MetricData> {
        self.recorded
            .metric_batches
            .lock()
            .iter()
            .rev()
            .flat_map(|batch| batch.iter())
            .find(|metric| metric.name == name)
            .cloned()
    }

    pub fn span_export_calls(&self) -> usize {
        self.recorded.span_batches.lock().len()
    }

    /// Every exported span, in export order.
    pub fn spans(&self) -> Vec<FinishedSpan> {
        self.recorded
            .span_batches
            .lock()
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn failed_calls(&self) -> usize {
        self.recorded.failed_calls.load(Ordering::SeqCst)
    }

    pub fn shutdown_calls(&self) -> usize {
        self.recorded.shutdowns.load(Ordering::SeqCst)
    }

    pub fn resource(&self) -> Option<Resource> {
        self.recorded.resource.lock().clone()
    }

    fn check_failing(&self) -> Result<(), ExportError> {
        if self.recorded.failing.load(Ordering::SeqCst) {
            self.recorded.failed_calls.fetch_add(1, Ordering::SeqCst);
            return Err(ExportError::Transport("in-memory transport set to fail".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("metric_export_calls", &self.metric_export_calls())
            .field("span_export_calls", &self.span_export_calls())
            .finish()
    }
}

#[async_trait]
impl MetricExporter for InMemoryTransport {
    async fn export(&self, metrics: Vec<MetricData>) -> Result<(), ExportError> {
        self.check_failing()?;
        self.recorded.metric_batches.lock().push(metrics);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.recorded.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SpanExporter for InMemoryTransport {
    async fn export(&self, batch: Vec<FinishedSpan>) -> Result<(), ExportError> {
        self.check_failing()?;
        self.recorded.span_batches.lock().push(batch);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.recorded.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl TransportFactory for InMemoryTransport {
    fn metric_exporter(
        &self,
        _config: &ExporterConfig,
        resource: &Resource,
    ) -> Result<Box<dyn MetricExporter>, PipelineError> {
        *self.recorded.resource.lock() = Some(resource.clone());
        Ok(Box::new(self.clone()))
    }

    fn span_exporter(
        &self,
        _config: &ExporterConfig,
        resource: &Resource,
    ) -> Result<Box<dyn SpanExporter>, PipelineError> {
        *self.recorded.resource.lock() = Some(resource.clone());
        Ok(Box::new(self.clone()))
    }
}
