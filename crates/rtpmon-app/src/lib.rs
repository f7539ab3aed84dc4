//! Live RTP monitor dashboard.
//!
//! Wires the components together:
//! - Feed connection with automatic refresh and reconnection
//! - Snapshot store with the persisted pair selection
//! - Full-rebuild rendering with chart focus
//! - Terminal frontend (ratatui) or headless logging backend

pub mod config;
pub mod controller;
pub mod error;
pub mod terminal;

pub use config::AppConfig;
pub use controller::{ConnectionStatus, DashboardController, UiEvent};
pub use error::{AppError, AppResult};
