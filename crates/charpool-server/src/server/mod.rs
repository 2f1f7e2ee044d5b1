//! HTTP service wiring.
//!
//! - [`config`] - CLI/env configuration.
//! - [`handler`] - routes and shared state.
//! - [`error`] - HTTP mapping for library errors.
//! - [`telemetry`] - logging and optional metrics.

pub mod config;
pub mod error;
pub mod handler;
pub mod telemetry;
