//! Application configuration.

use crate::error::{AppError, AppResult};
use rtpmon_telemetry::LoggingSettings;
use rtpmon_view::RenderOptions;
use rtpmon_ws::{endpoint_url, ConnectionConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Dashboard server origin, e.g. `https://rtp.example.com`.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Directory for durable client state (selection, terminal log).
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default)]
    pub connection: ConnectionSettings,

    #[serde(default)]
    pub view: ViewSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

fn default_origin() -> String {
    "http://localhost:8000".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".rtpmon")
}

/// Feed connection timing.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSettings {
    /// Delay before reconnecting after a close (ms). Default: 5,000.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Application ping period while open (ms). Default: 30,000.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Opening handshake timeout (ms). Default: 10,000.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Rendering options.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewSettings {
    /// Delay before the layout-settle pass (ms). Default: 100.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Target RTP reference line on daily charts. Default: none.
    #[serde(default)]
    pub daily_target_rtp: Option<f64>,
}

fn default_settle_delay_ms() -> u64 {
    100
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            daily_target_rtp: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            state_dir: default_state_dir(),
            connection: ConnectionSettings::default(),
            view: ViewSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse and validate TOML content.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not
    /// exist. A file that exists but does not parse is still an error.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn validate(&self) -> AppResult<()> {
        endpoint_url(&self.origin)?;

        if self.connection.reconnect_delay_ms == 0 {
            return Err(AppError::Config(
                "connection.reconnect_delay_ms must be positive".to_string(),
            ));
        }
        if self.connection.heartbeat_interval_ms == 0 {
            return Err(AppError::Config(
                "connection.heartbeat_interval_ms must be positive".to_string(),
            ));
        }
        if self.connection.connect_timeout_ms == 0 {
            return Err(AppError::Config(
                "connection.connect_timeout_ms must be positive".to_string(),
            ));
        }
        if let Some(target) = self.view.daily_target_rtp {
            if !target.is_finite() {
                return Err(AppError::Config(
                    "view.daily_target_rtp must be a finite number".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Connection settings for the feed, with the URL derived from `origin`.
    pub fn connection_config(&self) -> AppResult<ConnectionConfig> {
        Ok(ConnectionConfig {
            url: endpoint_url(&self.origin)?,
            reconnect_delay_ms: self.connection.reconnect_delay_ms,
            heartbeat_interval_ms: self.connection.heartbeat_interval_ms,
            connect_timeout_ms: self.connection.connect_timeout_ms,
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            daily_target_rtp: self.view.daily_target_rtp,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.view.settle_delay_ms)
    }

    /// Default log file for the terminal frontend.
    pub fn terminal_log_path(&self) -> PathBuf {
        self.state_dir.join("rtpmon.log")
    }
}
