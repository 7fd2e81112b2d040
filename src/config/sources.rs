//! Configuration sources, lowest priority first: file, `HOTELC__*`, OTEL overrides.

pub mod env;
pub mod file;
