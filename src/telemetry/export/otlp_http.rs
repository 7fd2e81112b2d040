//! OTLP/HTTP exporters posting protobuf bodies to `<endpoint>/v1/<signal>`.

use std::io::Write;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use prost::Message;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};

use crate::config::{Compression, ExporterConfig, Signal};
use crate::error::{ExportError, PipelineError};
use crate::telemetry::export::wire;
use crate::telemetry::export::{MetricExporter, SpanExporter};
use crate::telemetry::instruments::MetricData;
use crate::telemetry::resource::Resource;
use crate::telemetry::trace::FinishedSpan;

const PROTOBUF: &str = "application/x-protobuf";

/// One signal's HTTP client and target URL.
struct HttpClient {
    client: reqwest::Client,
    url: reqwest::Url,
    gzip: bool,
}

impl HttpClient {
    fn new(config: &ExporterConfig, signal: Signal) -> Result<Self, PipelineError> {
        let target = config.signal_endpoint(signal);
        let url = reqwest::Url::parse(&target).map_err(|e| PipelineError::InvalidEndpoint {
            endpoint: target.clone(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::with_capacity(config.headers.len() + 1);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PROTOBUF));
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                PipelineError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                PipelineError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            headers.insert(header_name, header_value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url,
            gzip: config.compression == Compression::Gzip,
        })
    }

    async fn post(&self, body: Vec<u8>) -> Result<(), ExportError> {
        let mut request = self.client.post(self.url.clone());
        let body = if self.gzip {
            request = request.header(CONTENT_ENCODING, "gzip");
            gzip(&body)?
        } else {
            body
        };

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ExportError::Transport(format!("request timed out: {e}"))
            } else {
                ExportError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(ExportError::Rejected {
            status: status.to_string(),
            message,
        })
    }
}

fn gzip(body: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), flate2::Compression::default());
    encoder
        .write_all(body)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ExportError::Encode(e.to_string()))
}

pub struct HttpMetricExporter {
    http: HttpClient,
    resource: Resource,
}

impl HttpMetricExporter {
    pub fn new(config: &ExporterConfig, resource: &Resource) -> Result<Self, PipelineError> {
        Ok(Self {
            http: HttpClient::new(config, Signal::Metrics)?,
            resource: resource.clone(),
        })
    }
}

#[async_trait]
impl MetricExporter for HttpMetricExporter {
    async fn export(&self, metrics: Vec<MetricData>) -> Result<(), ExportError> {
        let body = wire::metrics_request(&self.resource, &metrics).encode_to_vec();
        self.http.post(body).await
    }
}

pub struct HttpSpanExporter {
    http: HttpClient,
    resource: Resource,
}

impl HttpSpanExporter {
    pub fn new(config: &ExporterConfig, resource: &Resource) -> Result<Self, PipelineError> {
        Ok(Self {
            http: HttpClient::new(config, Signal::Traces)?,
            resource: resource.clone(),
        })
    }
}

#[async_trait]
impl SpanExporter for HttpSpanExporter {
    async fn export(&self, batch: Vec<FinishedSpan>) -> Result<(), ExportError> {
        let body = wire::trace_request(&self.resource, &batch).encode_to_vec();
        self.http.post(body).await
    }
}
