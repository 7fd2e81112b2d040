//! Integration tests for the hotelc telemetry engine

mod cli_commands;
mod config_loading;
mod instrument_gating;
mod lifecycle;
mod sampling;
mod session_spans;
mod test_utils;
mod unreachable_exporter;
