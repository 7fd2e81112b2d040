//! The `server.lifecycle` span: opened once at boot, ended at shutdown.

use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crate::telemetry::attributes::{keys, AttributeSet};
use crate::telemetry::trace::{ActiveSpan, SpanKind, SpanStatus, Tracer};

pub const SERVER_SPAN_NAME: &str = "server.lifecycle";

enum State {
    NotStarted,
    Open { span: ActiveSpan, booted: Instant },
    Ended,
}

pub struct ServerSpan {
    tracer: Tracer,
    state: Mutex<State>,
}

impl ServerSpan {
    pub fn new(tracer: Tracer) -> Self {
        Self {
            tracer,
            state: Mutex::new(State::NotStarted),
        }
    }

    /// Open the span with a `server.started` event. Only the first call per
    /// lifetime has any effect.
    pub fn start(&self, boot_time_ms: Option<u64>) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, State::NotStarted) {
            debug!("Server lifecycle span already started");
            return false;
        }
        let mut span = self.tracer.start(
            SERVER_SPAN_NAME,
            SpanKind::Server,
            AttributeSet::new().with(keys::EVENT_TYPE, "boot"),
        );
        span.add_event(
            "server.started",
            AttributeSet::new().with_opt(keys::BOOT_TIME_MS, boot_time_ms),
        );
        *state = State::Open {
            span,
            booted: Instant::now(),
        };
        true
    }

    pub fn add_event(&self, name: &'static str, attributes: AttributeSet) -> bool {
        match &mut *self.state.lock() {
            State::Open { span, .. } => {
                span.add_event(name, attributes);
                true
            }
            _ => {
                debug!(event = name, "Server lifecycle span not open, event dropped");
                false
            }
        }
    }

    /// Milliseconds since the span opened.
    pub fn uptime_ms(&self) -> Option<u64> {
        match &*self.state.lock() {
            State::Open { booted, .. } => Some(booted.elapsed().as_millis() as u64),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock(), State::Open { .. })
    }

    /// End the span if open. It can never be reopened afterwards.
    pub fn end(&self, status: SpanStatus) -> bool {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Ended);
        match previous {
            State::Open { span, .. } => {
                self.tracer.end(span, status);
                true
            }
            _ => false,
        }
    }
}
