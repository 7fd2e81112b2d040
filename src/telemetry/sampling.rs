//! Head sampling decided once, when a span starts.

use crate::telemetry::types::TraceId;

/// Admission policy for new traces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampler {
    AlwaysOn,
    AlwaysOff,
    /// Admit when the trace id's lower 63 bits fall under `rate * 2^63`.
    TraceIdRatio { rate: f64, bound: u64 },
}

impl Sampler {
    /// Build from a configured rate. A rate of 1.0 (or more) is always-on, never a
    /// ratio sampler at 1.
    pub fn from_rate(rate: f64) -> Self {
        if !rate.is_finite() || rate >= 1.0 {
            return Sampler::AlwaysOn;
        }
        if rate <= 0.0 {
            return Sampler::AlwaysOff;
        }
        let bound = (rate * (1u64 << 63) as f64) as u64;
        Sampler::TraceIdRatio { rate, bound }
    }

    pub fn should_sample(&self, trace_id: &TraceId) -> bool {
        match self {
            Sampler::AlwaysOn => true,
            Sampler::AlwaysOff => false,
            Sampler::TraceIdRatio { bound, .. } => (trace_id.low_u64() >> 1) < *bound,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Sampler::AlwaysOn => "AlwaysOnSampler".to_string(),
            Sampler::AlwaysOff => "AlwaysOffSampler".to_string(),
            Sampler::TraceIdRatio { rate, .. } => format!("TraceIdRatioBased{{{rate}}}"),
        }
    }
}
