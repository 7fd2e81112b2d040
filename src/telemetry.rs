//! Telemetry domain: attributes, instruments, spans, sessions, export.

mod types;

pub mod attributes;
pub mod export;
pub mod instruments;
pub mod pipeline;
pub mod resource;
pub mod sampling;
pub mod server_span;
pub mod sessions;
pub mod trace;

pub use attributes::{AttributeSet, AttributeValue, KeyValue};
pub use export::{InMemoryTransport, OtlpTransport, TransportFactory};
pub use instruments::{InstrumentId, InstrumentRegistry, MetricData, MetricProducer};
pub use pipeline::Pipeline;
pub use resource::Resource;
pub use sampling::Sampler;
pub use server_span::ServerSpan;
pub use sessions::{SessionKey, SessionStatus, SessionTracker};
pub use trace::{FinishedSpan, SpanStatus, Tracer};
pub use types::{now_millis, now_unix_nanos, SpanId, TraceId};
