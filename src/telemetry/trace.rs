//! Spans: creation through a sampled [`Tracer`], in-flight [`ActiveSpan`]s and the
//! immutable [`FinishedSpan`] records handed to a [`SpanProcessor`].

use std::borrow::Cow;
use std::sync::Arc;

use crate::telemetry::attributes::{AttributeSet, AttributeValue, Key};
use crate::telemetry::sampling::Sampler;
use crate::telemetry::types::{now_unix_nanos, SpanId, TraceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Internal,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Unset,
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanStatus {
    pub code: StatusCode,
    pub message: Cow<'static, str>,
}

impl SpanStatus {
    pub fn unset() -> Self {
        Self {
            code: StatusCode::Unset,
            message: Cow::Borrowed(""),
        }
    }

    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: Cow::Borrowed(""),
        }
    }

    pub fn ok_with(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code: StatusCode::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code: StatusCode::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpanEvent {
    pub name: Cow<'static, str>,
    pub time_unix_nano: u64,
    pub attributes: AttributeSet,
}

/// A span that has started and not yet ended.
///
/// Unsampled spans are still tracked so callers see consistent state, but they
/// are never handed to the processor.
#[derive(Debug)]
pub struct ActiveSpan {
    trace_id: TraceId,
    span_id: SpanId,
    name: Cow<'static, str>,
    kind: SpanKind,
    start_unix_nano: u64,
    attributes: AttributeSet,
    events: Vec<SpanEvent>,
    sampled: bool,
}

impl ActiveSpan {
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn events(&self) -> &[SpanEvent] {
        &self.events
    }

    pub fn set_attribute(&mut self, key: impl Into<Key>, value: impl Into<AttributeValue>) {
        if self.sampled {
            self.attributes.insert(key, value);
        }
    }

    pub fn add_event(&mut self, name: impl Into<Cow<'static, str>>, attributes: AttributeSet) {
        if self.sampled {
            self.events.push(SpanEvent {
                name: name.into(),
                time_unix_nano: now_unix_nanos(),
                attributes,
            });
        }
    }

    fn finish(self, status: SpanStatus) -> FinishedSpan {
        FinishedSpan {
            trace_id: self.trace_id,
            span_id: self.span_id,
            name: self.name,
            kind: self.kind,
            start_unix_nano: self.start_unix_nano,
            end_unix_nano: now_unix_nanos().max(self.start_unix_nano),
            attributes: self.attributes,
            events: self.events,
            status,
        }
    }
}

/// A completed span, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSpan {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub name: Cow<'static, str>,
    pub kind: SpanKind,
    pub start_unix_nano: u64,
    pub end_unix_nano: u64,
    pub attributes: AttributeSet,
    pub events: Vec<SpanEvent>,
    pub status: SpanStatus,
}

/// Receives spans as they end. Must not block.
pub trait SpanProcessor: Send + Sync {
    fn on_end(&self, span: FinishedSpan);
}

/// Starts root spans and forwards sampled ones to the processor when they end.
#[derive(Clone)]
pub struct Tracer {
    sampler: Sampler,
    processor: Arc<dyn SpanProcessor>,
}

impl Tracer {
    pub fn new(sampler: Sampler, processor: Arc<dyn SpanProcessor>) -> Self {
        Self { sampler, processor }
    }

    pub fn start(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        attributes: AttributeSet,
    ) -> ActiveSpan {
        let trace_id = TraceId::random();
        let sampled = self.sampler.should_sample(&trace_id);
        ActiveSpan {
            trace_id,
            span_id: SpanId::random(),
            name: name.into(),
            kind,
            start_unix_nano: now_unix_nanos(),
            attributes: if sampled { attributes } else { AttributeSet::new() },
            events: Vec::new(),
            sampled,
        }
    }

    /// End the span now. Returns whether it was handed to the processor.
    pub fn end(&self, span: ActiveSpan, status: SpanStatus) -> bool {
        if !span.sampled {
            return false;
        }
        self.processor.on_end(span.finish(status));
        true
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("sampler", &self.sampler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use parking_lot::Mutex;

    use super::*;

    /// Processor that keeps every span it receives.
    #[derive(Default)]
    pub struct CollectingProcessor {
        pub spans: Mutex<Vec<FinishedSpan>>,
    }

    impl SpanProcessor for CollectingProcessor {
        fn on_end(&self, span: FinishedSpan) {
            self.spans.lock().push(span);
        }
    }

    pub fn tracer(rate: f64) -> (Tracer, Arc<CollectingProcessor>) {
        let processor = Arc::new(CollectingProcessor::default());
        (Tracer::new(Sampler::from_rate(rate), processor.clone()), processor)
    }
}
