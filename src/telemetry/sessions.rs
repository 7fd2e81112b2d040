//! Session Span Tracker: one open trace span per entity key.

pub mod policy;
pub mod tracker;

pub use policy::{SessionKey, SessionStatus, SESSION_SPAN_NAME};
pub use tracker::{OpenOutcome, SessionTracker};
