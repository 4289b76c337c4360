//! Gateway configuration
//!
//! Layered with figment: built-in defaults, then an optional file selected by
//! extension (`.yaml`/`.yml`, `.toml`, `.json`), then `FCUGW_` environment
//! variables with `__` as the section separator
//! (e.g. `FCUGW_CAN__BITRATE=500000`, `FCUGW_PROTOCOL__VERSION=legacy`).

use crate::error::{GatewayError, Result};
use fcu_protocol::ProtocolVersion;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default API port
pub const DEFAULT_PORT: u16 = 8765;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FCUGW_";

/// Bit rates accepted by the USB-CAN adapter
pub const SUPPORTED_BITRATES: [u32; 13] = [
    10_000, 20_000, 40_000, 50_000, 80_000, 100_000, 125_000, 200_000, 250_000, 400_000, 500_000,
    800_000, 1_000_000,
];

/// CAN driver backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Built-in controller simulator
    #[default]
    Virtual,
    /// candump log playback
    Replay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanConfig {
    pub driver: DriverKind,
    pub bitrate: u32,
    /// Maximum frames per receive poll
    pub rx_batch_size: usize,
    /// Sleep between receive polls
    pub poll_interval_ms: u64,
    /// Simulator frame period
    pub sim_period_ms: u64,
    pub replay_file: Option<PathBuf>,
    pub replay_loop: bool,
}

impl Default for CanConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Virtual,
            bitrate: 250_000,
            rx_batch_size: 50,
            poll_interval_ms: 10,
            sim_period_ms: 100,
            replay_file: None,
            replay_loop: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub version: ProtocolVersion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Snapshot publish rate
    pub rate_hz: f64,
    /// Snapshots buffered per lagging subscriber
    pub capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            rate_hz: 10.0,
            capacity: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub level: String,
    /// JSON lines in the log file instead of the bracketed text format
    pub json: bool,
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            level: "info".to_string(),
            json: false,
            file: true,
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub can: CanConfig,
    pub protocol: ProtocolConfig,
    pub api: ApiConfig,
    pub broadcast: BroadcastConfig,
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Defaults → optional file → environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(GatewayConfig::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(GatewayError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            figment = merge_file(figment, path)?;
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// Extract and validate from a prepared figment
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: GatewayConfig = figment
            .extract()
            .map_err(|e| GatewayError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_BITRATES.contains(&self.can.bitrate) {
            return Err(GatewayError::config(format!(
                "Unsupported bitrate {} (supported: {:?})",
                self.can.bitrate, SUPPORTED_BITRATES
            )));
        }
        if self.can.rx_batch_size == 0 {
            return Err(GatewayError::config("can.rx_batch_size must be positive"));
        }
        if self.can.driver == DriverKind::Replay && self.can.replay_file.is_none() {
            return Err(GatewayError::config(
                "can.replay_file is required for the replay driver",
            ));
        }
        if !(self.broadcast.rate_hz > 0.0 && self.broadcast.rate_hz <= 100.0) {
            return Err(GatewayError::config(format!(
                "broadcast.rate_hz must be in (0, 100], got {}",
                self.broadcast.rate_hz
            )));
        }
        if self.broadcast.capacity == 0 {
            return Err(GatewayError::config("broadcast.capacity must be positive"));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.broadcast.rate_hz)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.can.poll_interval_ms)
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| GatewayError::config("Invalid file extension"))?;

    let figment = match extension {
        "json" => figment.merge(Json::file(path)),
        "toml" => figment.merge(Toml::file(path)),
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        _ => {
            return Err(GatewayError::config(format!(
                "Unsupported config format: {}",
                extension
            )))
        },
    };
    Ok(figment)
}
