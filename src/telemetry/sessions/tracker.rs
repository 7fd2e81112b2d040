//! Concurrent registry of open session spans.
//!
//! The live map is sharded, so transitions for one key lock only that key's
//! shard. Per key the state machine is `NONE -> OPEN -> CLOSED (removed)`; events
//! for a key with no open session are dropped and never create one. Once
//! [`SessionTracker::close_all`] has run, no new session can be opened.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::config::ReopenPolicy;
use crate::telemetry::attributes::{keys, AttributeSet};
use crate::telemetry::sessions::policy::{SessionKey, SessionStatus, SESSION_SPAN_NAME};
use crate::telemetry::trace::{ActiveSpan, SpanKind, Tracer};

struct SessionSpan {
    span: ActiveSpan,
    opened_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    /// A stale session for the key was closed as superseded.
    Superseded,
    /// A stale session for the key was discarded without export.
    Overwritten,
    /// The tracker is closed; no span was kept.
    Refused,
}

pub struct SessionTracker {
    tracer: Tracer,
    policy: ReopenPolicy,
    live: DashMap<SessionKey, SessionSpan>,
    closed: AtomicBool,
}

impl SessionTracker {
    pub fn new(tracer: Tracer, policy: ReopenPolicy) -> Self {
        Self {
            tracer,
            policy,
            live: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Start a session span for `key`. An already open session for the key is
    /// resolved by the reopen policy first. Refused after `close_all`.
    pub fn open(&self, key: SessionKey, attributes: AttributeSet) -> OpenOutcome {
        if self.closed.load(Ordering::SeqCst) {
            debug!(session = %key, "Session tracker closed, open refused");
            return OpenOutcome::Refused;
        }
        let span = self
            .tracer
            .start(SESSION_SPAN_NAME, SpanKind::Server, attributes);
        let session = SessionSpan {
            span,
            opened_at: Instant::now(),
        };

        let stale = self.live.insert(key.clone(), session);

        // A sweep that started after the check above may have missed this entry.
        if self.closed.load(Ordering::SeqCst) {
            if let Some((_, session)) = self.live.remove(&key) {
                self.finish(session, &SessionStatus::Interrupted);
            }
            if let Some(stale) = stale {
                self.finish(stale, &SessionStatus::Interrupted);
            }
            debug!(session = %key, "Session tracker closed while opening, span ended");
            return OpenOutcome::Refused;
        }

        match stale {
            None => {
                trace!(session = %key, "Session opened");
                OpenOutcome::Opened
            }
            Some(stale) => match self.policy {
                ReopenPolicy::Supersede => {
                    debug!(session = %key, "Session reopened, closing stale span as superseded");
                    self.finish(stale, &SessionStatus::Superseded);
                    OpenOutcome::Superseded
                }
                ReopenPolicy::Overwrite => {
                    debug!(session = %key, "Session reopened, discarding stale span");
                    OpenOutcome::Overwritten
                }
            },
        }
    }

    /// Add an event to the open session for `key`. Returns false, and records
    /// nothing, when no session is open.
    pub fn append_event(
        &self,
        key: &SessionKey,
        name: &'static str,
        attributes: AttributeSet,
    ) -> bool {
        match self.live.get_mut(key) {
            Some(mut session) => {
                session.span.add_event(name, attributes);
                true
            }
            None => {
                debug!(session = %key, event = name, "No open session, event dropped");
                false
            }
        }
    }

    /// Close and export the session for `key`. Returns false when none is open.
    pub fn close(&self, key: &SessionKey, status: SessionStatus) -> bool {
        match self.live.remove(key) {
            Some((_, session)) => {
                trace!(session = %key, status = status.as_str(), "Session closed");
                self.finish(session, &status);
                true
            }
            None => {
                debug!(session = %key, "Close for a session that is not open");
                false
            }
        }
    }

    /// Close every open session with `status`, empty the registry and refuse
    /// later opens. Returns the number closed.
    pub fn close_all(&self, status: SessionStatus) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        // Keys are collected first; removing while iterating would deadlock the shard.
        let keys: Vec<SessionKey> = self.live.iter().map(|entry| entry.key().clone()).collect();
        let mut closed = 0;
        for key in keys {
            if let Some((_, session)) = self.live.remove(&key) {
                self.finish(session, &status);
                closed += 1;
            }
        }
        if closed > 0 {
            debug!(closed, status = status.as_str(), "Closed all open sessions");
        }
        closed
    }

    pub fn is_open(&self, key: &SessionKey) -> bool {
        self.live.contains_key(key)
    }

    pub fn open_count(&self) -> usize {
        self.live.len()
    }

    fn finish(&self, mut session: SessionSpan, status: &SessionStatus) {
        let duration_ms = session.opened_at.elapsed().as_millis() as i64;
        session.span.set_attribute(keys::SESSION_STATUS, status.as_str());
        session.span.set_attribute(keys::SESSION_DURATION_MS, duration_ms);
        self.tracer.end(session.span, status.span_status());
    }
}
