//! View error types.

use crate::tree::ContainerId;
use thiserror::Error;

/// Focus could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FocusError {
    #[error("No chart container {0} in the current view")]
    ContainerNotFound(ContainerId),
}

pub type FocusResult<T> = Result<T, FocusError>;

/// The chart backend rejected a plot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Plot failed for {container}: {reason}")]
pub struct PlotError {
    pub container: ContainerId,
    pub reason: String,
}

impl PlotError {
    pub fn new(container: ContainerId, reason: impl Into<String>) -> Self {
        Self {
            container,
            reason: reason.into(),
        }
    }
}
