//! Conversion of finished spans and collected metrics into OTLP protobuf requests.

use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::metrics::v1::{
    metric, number_data_point, AggregationTemporality, Gauge, Metric, NumberDataPoint,
    ResourceMetrics, ScopeMetrics, Sum,
};
use opentelemetry_proto::tonic::resource::v1::Resource as ProtoResource;
use opentelemetry_proto::tonic::trace::v1::{
    span, status, ResourceSpans, ScopeSpans, Span, Status,
};

use crate::telemetry::attributes::{AttributeSet, AttributeValue};
use crate::telemetry::instruments::{MetricData, MetricPoints, NumberPoint, NumberValue};
use crate::telemetry::resource::{Resource, SDK_VERSION};
use crate::telemetry::trace::{FinishedSpan, SpanEvent, SpanKind, StatusCode};

/// Instrumentation scope shared by every metric and span.
pub const SCOPE_NAME: &str = "hotel-c";

fn scope() -> InstrumentationScope {
    InstrumentationScope {
        name: SCOPE_NAME.to_string(),
        version: SDK_VERSION.to_string(),
        ..Default::default()
    }
}

fn any_value(value: &AttributeValue) -> AnyValue {
    let value = match value {
        AttributeValue::String(s) => any_value::Value::StringValue(s.to_string()),
        AttributeValue::Int(i) => any_value::Value::IntValue(*i),
        AttributeValue::Double(d) => any_value::Value::DoubleValue(*d),
        AttributeValue::Bool(b) => any_value::Value::BoolValue(*b),
    };
    AnyValue { value: Some(value) }
}

pub fn key_values(attributes: &AttributeSet) -> Vec<KeyValue> {
    attributes
        .iter()
        .map(|kv| KeyValue {
            key: kv.key.to_string(),
            value: Some(any_value(&kv.value)),
        })
        .collect()
}

fn resource(resource: &Resource) -> ProtoResource {
    ProtoResource {
        attributes: key_values(resource.attributes()),
        ..Default::default()
    }
}

fn span_kind(kind: SpanKind) -> span::SpanKind {
    match kind {
        SpanKind::Internal => span::SpanKind::Internal,
        SpanKind::Server => span::SpanKind::Server,
    }
}

fn status_code(code: StatusCode) -> status::StatusCode {
    match code {
        StatusCode::Unset => status::StatusCode::Unset,
        StatusCode::Ok => status::StatusCode::Ok,
        StatusCode::Error => status::StatusCode::Error,
    }
}

fn event(event: &SpanEvent) -> span::Event {
    span::Event {
        time_unix_nano: event.time_unix_nano,
        name: event.name.to_string(),
        attributes: key_values(&event.attributes),
        ..Default::default()
    }
}

fn proto_span(finished: &FinishedSpan) -> Span {
    Span {
        trace_id: finished.trace_id.as_bytes().to_vec(),
        span_id: finished.span_id.as_bytes().to_vec(),
        name: finished.name.to_string(),
        kind: span_kind(finished.kind) as i32,
        start_time_unix_nano: finished.start_unix_nano,
        end_time_unix_nano: finished.end_unix_nano,
        attributes: key_values(&finished.attributes),
        events: finished.events.iter().map(event).collect(),
        status: Some(Status {
            message: finished.status.message.to_string(),
            code: status_code(finished.status.code) as i32,
        }),
        ..Default::default()
    }
}

pub fn trace_request(res: &Resource, spans: &[FinishedSpan]) -> ExportTraceServiceRequest {
    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(resource(res)),
            scope_spans: vec![ScopeSpans {
                scope: Some(scope()),
                spans: spans.iter().map(proto_span).collect(),
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

fn data_point(point: &NumberPoint) -> NumberDataPoint {
    let value = match point.value {
        NumberValue::Int(i) => number_data_point::Value::AsInt(i),
        NumberValue::Double(d) => number_data_point::Value::AsDouble(d),
    };
    NumberDataPoint {
        attributes: key_values(&point.attributes),
        start_time_unix_nano: point.start_time_unix_nano,
        time_unix_nano: point.time_unix_nano,
        value: Some(value),
        ..Default::default()
    }
}

fn proto_metric(data: &MetricData) -> Metric {
    let payload = match &data.points {
        MetricPoints::Sum { monotonic, points } => metric::Data::Sum(Sum {
            data_points: points.iter().map(data_point).collect(),
            aggregation_temporality: AggregationTemporality::Cumulative as i32,
            is_monotonic: *monotonic,
        }),
        MetricPoints::Gauge { points } => metric::Data::Gauge(Gauge {
            data_points: points.iter().map(data_point).collect(),
        }),
    };
    Metric {
        name: data.name.to_string(),
        description: data.description.to_string(),
        unit: data.unit.to_string(),
        data: Some(payload),
        ..Default::default()
    }
}

pub fn metrics_request(res: &Resource, metrics: &[MetricData]) -> ExportMetricsServiceRequest {
    ExportMetricsServiceRequest {
        resource_metrics: vec![ResourceMetrics {
            resource: Some(resource(res)),
            scope_metrics: vec![ScopeMetrics {
                scope: Some(scope()),
                metrics: metrics.iter().map(proto_metric).collect(),
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}
