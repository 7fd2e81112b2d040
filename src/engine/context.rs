//! The per-engine telemetry context handed to every recorder.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::TelemetryConfig;
use crate::error::{EngineError, PipelineError};
use crate::telemetry::export::TransportFactory;
use crate::telemetry::instruments::InstrumentRegistry;
use crate::telemetry::pipeline::Pipeline;
use crate::telemetry::sampling::Sampler;
use crate::telemetry::server_span::ServerSpan;
use crate::telemetry::sessions::{SessionStatus, SessionTracker};
use crate::telemetry::trace::{SpanStatus, Tracer};

/// Everything a running engine owns. Built whole or not at all.
pub struct TelemetryContext {
    config: Arc<TelemetryConfig>,
    instruments: Arc<InstrumentRegistry>,
    tracer: Option<Tracer>,
    sessions: Option<SessionTracker>,
    server_span: Option<ServerSpan>,
    pipeline: Pipeline,
}

impl TelemetryContext {
    /// Validate, start the pipeline, then build the instruments and wire them to it.
    pub fn build(
        config: TelemetryConfig,
        transport: &dyn TransportFactory,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let pipeline = Pipeline::new(&config, transport)?;

        let instruments = Arc::new(InstrumentRegistry::new(&config.metrics));
        if config.metrics.enabled {
            pipeline.register_producer(instruments.clone());
        }

        let sampler = Sampler::from_rate(config.tracing.effective_sample_rate());
        let tracer = pipeline
            .span_processor()
            .map(|processor| Tracer::new(sampler, processor));
        let sessions = tracer
            .as_ref()
            .filter(|_| config.tracing.sessions_enabled())
            .map(|tracer| {
                SessionTracker::new(tracer.clone(), config.tracing.session_reopen_policy)
            });
        let server_span = tracer.as_ref().map(|tracer| ServerSpan::new(tracer.clone()));

        info!(
            service = %config.service.name,
            instruments = instruments.enabled_count(),
            sampler = %sampler.description(),
            sessions = sessions.is_some(),
            "Telemetry context built"
        );

        Ok(Self {
            config: Arc::new(config),
            instruments,
            tracer,
            sessions,
            server_span,
            pipeline,
        })
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn instruments(&self) -> &InstrumentRegistry {
        &self.instruments
    }

    /// Tracer for ad-hoc spans, when tracing is enabled.
    pub fn tracer(&self) -> Option<&Tracer> {
        self.tracer.as_ref()
    }

    /// Session tracker, when tracing and session tracing are both enabled.
    pub fn sessions(&self) -> Option<&SessionTracker> {
        self.sessions.as_ref()
    }

    pub fn server_span(&self) -> Option<&ServerSpan> {
        self.server_span.as_ref()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn force_flush(&self) -> Result<(), PipelineError> {
        self.pipeline.force_flush()
    }

    /// Close sessions, end the server span, then shut the pipeline down. Every
    /// step runs even if an earlier one fails.
    pub(crate) fn teardown(&self) {
        best_effort("close sessions", || {
            if let Some(sessions) = &self.sessions {
                let closed = sessions.close_all(SessionStatus::Interrupted);
                info!(closed, "Closed open sessions for shutdown");
            }
        });
        best_effort("end server span", || {
            if let Some(server_span) = &self.server_span {
                server_span.end(SpanStatus::ok());
            }
        });
        best_effort("shut down pipeline", || {
            if let Err(err) = self.pipeline.shutdown() {
                warn!(error = %err, "Exporter pipeline did not shut down cleanly");
            }
        });
    }
}

fn best_effort(step: &'static str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(step, "Shutdown step panicked, continuing");
    }
}
