//! Error types for rtpmon-core.

use thiserror::Error;

/// Validation failure for a single pair's series.
///
/// A pair that fails validation is kept in the snapshot so the view can
/// show an error row for it while every other pair renders normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("pair payload is not an object")]
    NotAnObject,

    #[error("malformed series: {0}")]
    Malformed(String),

    #[error("{series} has {actual} points but {axis} has {expected}")]
    LengthMismatch {
        series: &'static str,
        axis: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Inbound message that could not be interpreted at all.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Message parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message is not a JSON object")]
    NotAnObject,
}
