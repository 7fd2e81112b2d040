//! OTLP/gRPC exporters over a lazily connected tonic channel.

use std::time::Duration;

use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::metrics::v1::metrics_service_client::MetricsServiceClient;
use opentelemetry_proto::tonic::collector::trace::v1::trace_service_client::TraceServiceClient;
use tonic::codec::CompressionEncoding;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::warn;

use crate::config::{Compression, ExporterConfig};
use crate::error::{ExportError, PipelineError};
use crate::telemetry::export::wire;
use crate::telemetry::export::{MetricExporter, SpanExporter};
use crate::telemetry::instruments::MetricData;
use crate::telemetry::resource::Resource;
use crate::telemetry::trace::FinishedSpan;

/// Channel, metadata and timeout shared by both signal clients.
struct GrpcSettings {
    channel: Channel,
    metadata: MetadataMap,
    timeout: Duration,
    gzip: bool,
}

impl GrpcSettings {
    /// Must be called within a tokio runtime context.
    fn new(config: &ExporterConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            channel: endpoint(config)?.connect_lazy(),
            metadata: metadata(config)?,
            timeout: config.timeout(),
            gzip: config.compression == Compression::Gzip,
        })
    }

    fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        *request.metadata_mut() = self.metadata.clone();
        request.set_timeout(self.timeout);
        request
    }
}

/// Endpoint with timeouts, and TLS against the platform roots for `https`.
fn endpoint(config: &ExporterConfig) -> Result<Endpoint, PipelineError> {
    let invalid = |reason: String| PipelineError::InvalidEndpoint {
        endpoint: config.endpoint.clone(),
        reason,
    };
    let endpoint = Endpoint::from_shared(config.endpoint.clone())
        .map_err(|e| invalid(e.to_string()))?
        .timeout(config.timeout())
        .connect_timeout(config.timeout());
    if endpoint.uri().scheme_str() != Some("https") {
        return Ok(endpoint);
    }
    endpoint
        .tls_config(ClientTlsConfig::new().with_native_roots())
        .map_err(|e| invalid(e.to_string()))
}

fn metadata(config: &ExporterConfig) -> Result<MetadataMap, PipelineError> {
    let mut metadata = MetadataMap::with_capacity(config.headers.len());
    for (name, value) in &config.headers {
        let key = MetadataKey::from_bytes(name.to_ascii_lowercase().as_bytes()).map_err(|e| {
            PipelineError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        let value = MetadataValue::try_from(value.as_str()).map_err(|e| {
            PipelineError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

fn rejected(status: tonic::Status) -> ExportError {
    match status.code() {
        tonic::Code::DeadlineExceeded => ExportError::Transport(status.message().to_string()),
        tonic::Code::Unavailable => ExportError::Transport(status.message().to_string()),
        code => ExportError::Rejected {
            status: format!("{code:?}"),
            message: status.message().to_string(),
        },
    }
}

pub struct GrpcMetricExporter {
    client: MetricsServiceClient<Channel>,
    settings: GrpcSettings,
    resource: Resource,
}

impl GrpcMetricExporter {
    pub fn new(config: &ExporterConfig, resource: &Resource) -> Result<Self, PipelineError> {
        let settings = GrpcSettings::new(config)?;
        let mut client = MetricsServiceClient::new(settings.channel.clone());
        if settings.gzip {
            client = client.send_compressed(CompressionEncoding::Gzip);
        }
        Ok(Self {
            client,
            settings,
            resource: resource.clone(),
        })
    }
}

#[async_trait]
impl MetricExporter for GrpcMetricExporter {
    async fn export(&self, metrics: Vec<MetricData>) -> Result<(), ExportError> {
        let request = self
            .settings
            .request(wire::metrics_request(&self.resource, &metrics));
        let response = self
            .client
            .clone()
            .export(request)
            .await
            .map_err(rejected)?
            .into_inner();
        if let Some(partial) = response.partial_success {
            if partial.rejected_data_points > 0 {
                warn!(
                    rejected = partial.rejected_data_points,
                    message = %partial.error_message,
                    "Collector rejected part of a metric export"
                );
            }
        }
        Ok(())
    }
}

pub struct GrpcSpanExporter {
    client: TraceServiceClient<Channel>,
    settings: GrpcSettings,
    resource: Resource,
}

impl GrpcSpanExporter {
    pub fn new(config: &ExporterConfig, resource: &Resource) -> Result<Self, PipelineError> {
        let settings = GrpcSettings::new(config)?;
        let mut client = TraceServiceClient::new(settings.channel.clone());
        if settings.gzip {
            client = client.send_compressed(CompressionEncoding::Gzip);
        }
        Ok(Self {
            client,
            settings,
            resource: resource.clone(),
        })
    }
}

#[async_trait]
impl SpanExporter for GrpcSpanExporter {
    async fn export(&self, batch: Vec<FinishedSpan>) -> Result<(), ExportError> {
        let request = self
            .settings
            .request(wire::trace_request(&self.resource, &batch));
        let response = self
            .client
            .clone()
            .export(request)
            .await
            .map_err(rejected)?
            .into_inner();
        if let Some(partial) = response.partial_success {
            if partial.rejected_spans > 0 {
                warn!(
                    rejected = partial.rejected_spans,
                    message = %partial.error_message,
                    "Collector rejected part of a span export"
                );
            }
        }
        Ok(())
    }
}
