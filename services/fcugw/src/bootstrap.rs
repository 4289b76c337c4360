//! Service bootstrap
//!
//! Command-line arguments and the config/CLI merge applied before the
//! bridge starts.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use clap::Parser;
use fcu_protocol::ProtocolVersion;
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments for fcugw
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fcugw",
    version = env!("CARGO_PKG_VERSION"),
    about = "Fuel-cell control unit CAN gateway",
    long_about = None
)]
pub struct Args {
    /// Configuration file (.yaml, .yml, .toml or .json)
    #[arg(short = 'c', long, env = "FCUGW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides logging.level
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Bind address for API server, e.g. 127.0.0.1:8765
    #[arg(short = 'b', long)]
    pub bind: Option<String>,

    /// Protocol table (legacy | extended); overrides protocol.version
    #[arg(short = 'p', long)]
    pub protocol: Option<ProtocolVersion>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Validation mode - only validate configuration without starting service
    #[arg(long)]
    pub validate: bool,
}

impl Args {
    /// CLI values win over file and environment
    pub fn apply_overrides(&self, config: &mut GatewayConfig) {
        if let Some(version) = self.protocol {
            config.protocol.version = version;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

/// Determine bind address
/// Priority: CLI > Config (file, then environment) > Default
pub fn determine_bind_address(cli_arg: Option<&str>, config: &GatewayConfig) -> String {
    if let Some(addr) = cli_arg {
        info!("Using bind address from command line: {}", addr);
        return addr.to_string();
    }
    config.bind_address()
}

/// Log the effective configuration
pub fn describe_configuration(config: &GatewayConfig) {
    info!(
        "CAN: driver={:?} bitrate={} batch={} poll={}ms",
        config.can.driver,
        config.can.bitrate,
        config.can.rx_batch_size,
        config.can.poll_interval_ms
    );
    if let Some(path) = &config.can.replay_file {
        info!("Replay file: {} (loop={})", path.display(), config.can.replay_loop);
    }
    info!("Protocol table: {}", config.protocol.version);
    info!(
        "Broadcast: {} Hz, capacity {}",
        config.broadcast.rate_hz, config.broadcast.capacity
    );
    info!("API: {}", config.bind_address());
}

/// Effective configuration as YAML, printed in validation mode
pub fn render_configuration(config: &GatewayConfig) -> Result<String> {
    serde_yaml::to_string(config)
        .map_err(|e| GatewayError::config(format!("Failed to render config: {}", e)))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_args() {
        let args = Args::try_parse_from([
            "fcugw",
            "--config",
            "config/fcugw.yaml",
            "-l",
            "debug",
            "--bind",
            "127.0.0.1:9000",
            "--protocol",
            "legacy",
            "--validate",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("config/fcugw.yaml")));
        assert_eq!(args.protocol, Some(ProtocolVersion::Legacy));
        assert!(args.validate);
        assert!(!args.no_color);

        let mut config = GatewayConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.protocol.version, ProtocolVersion::Legacy);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            determine_bind_address(args.bind.as_deref(), &config),
            "127.0.0.1:9000"
        );
    }

    #[test]
    fn test_rejects_unknown_protocol() {
        assert!(Args::try_parse_from(["fcugw", "--protocol", "v9"]).is_err());
    }

    #[test]
    fn test_rendered_configuration_reloads() {
        let mut config = GatewayConfig::default();
        config.protocol.version = ProtocolVersion::Legacy;
        let yaml = render_configuration(&config).unwrap();
        assert!(yaml.contains("version: legacy"));

        let reloaded: GatewayConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_bind_falls_back_to_config() {
        let mut config = GatewayConfig::default();
        config.api.port = 9100;
        assert_eq!(determine_bind_address(None, &config), "0.0.0.0:9100");
    }
}
