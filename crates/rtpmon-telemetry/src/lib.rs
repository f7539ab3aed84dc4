//! Structured logging for the RTP monitor.
//!
//! Pretty output during development, JSON in production, and an optional
//! log file for the terminal frontend, which owns stdout.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat, LoggingSettings, DEFAULT_FILTER};
