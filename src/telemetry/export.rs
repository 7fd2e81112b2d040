//! Exporters and the transport factory that builds them.
//!
//! An exporter performs one network call per batch and reports the outcome. It
//! never retries; the pipeline logs failures and moves on.

use async_trait::async_trait;

use crate::config::{ExporterConfig, Protocol};
use crate::error::{ExportError, PipelineError};
use crate::telemetry::instruments::MetricData;
use crate::telemetry::resource::Resource;
use crate::telemetry::trace::FinishedSpan;

pub mod memory;
pub mod otlp_grpc;
pub mod otlp_http;
pub mod wire;

pub use memory::InMemoryTransport;

#[async_trait]
pub trait SpanExporter: Send + Sync {
    async fn export(&self, batch: Vec<FinishedSpan>) -> Result<(), ExportError>;

    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }
}

#[async_trait]
pub trait MetricExporter: Send + Sync {
    async fn export(&self, metrics: Vec<MetricData>) -> Result<(), ExportError>;

    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Builds the exporters for both signals from shared transport settings.
///
/// Called from inside the pipeline's runtime context, so implementations may
/// create runtime-bound resources such as lazy gRPC channels.
pub trait TransportFactory: Send + Sync {
    fn metric_exporter(
        &self,
        config: &ExporterConfig,
        resource: &Resource,
    ) -> Result<Box<dyn MetricExporter>, PipelineError>;

    fn span_exporter(
        &self,
        config: &ExporterConfig,
        resource: &Resource,
    ) -> Result<Box<dyn SpanExporter>, PipelineError>;
}

/// OTLP over gRPC or HTTP/protobuf, chosen by `exporter.protocol`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtlpTransport;

impl TransportFactory for OtlpTransport {
    fn metric_exporter(
        &self,
        config: &ExporterConfig,
        resource: &Resource,
    ) -> Result<Box<dyn MetricExporter>, PipelineError> {
        Ok(match config.protocol {
            Protocol::Grpc => Box::new(otlp_grpc::GrpcMetricExporter::new(config, resource)?),
            Protocol::Http => Box::new(otlp_http::HttpMetricExporter::new(config, resource)?),
        })
    }

    fn span_exporter(
        &self,
        config: &ExporterConfig,
        resource: &Resource,
    ) -> Result<Box<dyn SpanExporter>, PipelineError> {
        Ok(match config.protocol {
            Protocol::Grpc => Box::new(otlp_grpc::GrpcSpanExporter::new(config, resource)?),
            Protocol::Http => Box::new(otlp_http::HttpSpanExporter::new(config, resource)?),
        })
    }
}
