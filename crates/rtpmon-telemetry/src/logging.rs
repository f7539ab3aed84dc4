//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info,rtpmon=debug";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON when `RUST_ENV=production`, pretty otherwise.
    #[default]
    Auto,
    Pretty,
    Json,
}

impl LogFormat {
    /// Resolve `Auto` against the environment.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => {
                let is_production = std::env::var("RUST_ENV")
                    .map(|v| v == "production")
                    .unwrap_or(false);
                if is_production {
                    Self::Json
                } else {
                    Self::Pretty
                }
            }
            other => other,
        }
    }
}

/// Logging section of the application config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence.
    pub filter: Option<String>,
    pub format: LogFormat,
    /// Write logs here instead of stdout.
    pub file: Option<PathBuf>,
}

impl LoggingSettings {
    /// Same settings, but logging to `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(self.filter.as_deref().unwrap_or(DEFAULT_FILTER))
        })
    }
}

/// Initialize the global subscriber.
///
/// Fails if a subscriber is already installed or the log file cannot be
/// opened.
pub fn init_logging(settings: &LoggingSettings) -> TelemetryResult<()> {
    let format = settings.format.resolve();

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match &settings.file {
        Some(path) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
            match format {
                LogFormat::Json => layer.json().with_current_span(true).boxed(),
                _ => layer.with_target(true).boxed(),
            }
        }
        None => match format {
            // JSON format for production
            LogFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .boxed(),
            // Pretty format for development
            _ => fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_names(true)
                .boxed(),
        },
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(settings.env_filter())
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn open_log_file(path: &Path) -> TelemetryResult<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
