//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] rtpmon_ws::WsError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] rtpmon_telemetry::TelemetryError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] rtpmon_persistence::PersistenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
