//! Configuration file loading

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use fcu_protocol::ProtocolVersion;
use fcugw::config::{DriverKind, GatewayConfig, DEFAULT_PORT};
use fcugw::GatewayError;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_yaml_overrides_defaults() {
    let file = write_config(
        ".yaml",
        r#"
can:
  driver: replay
  bitrate: 500000
  replay_file: captures/bench.log
  replay_loop: true
protocol:
  version: legacy
api:
  port: 9000
"#,
    );

    let config = GatewayConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.can.driver, DriverKind::Replay);
    assert_eq!(config.can.bitrate, 500_000);
    assert_eq!(config.can.replay_file, Some(PathBuf::from("captures/bench.log")));
    assert!(config.can.replay_loop);
    assert_eq!(config.protocol.version, ProtocolVersion::Legacy);
    assert_eq!(config.api.port, 9000);
    // Untouched sections keep defaults
    assert_eq!(config.can.rx_batch_size, 50);
    assert_eq!(config.broadcast.rate_hz, 10.0);
}

#[test]
fn test_toml_config() {
    let file = write_config(
        ".toml",
        r#"
[broadcast]
rate_hz = 20.0

[logging]
level = "debug"
json = true
"#,
    );

    let config = GatewayConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.broadcast.rate_hz, 20.0);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert_eq!(config.api.port, DEFAULT_PORT);
}

#[test]
fn test_json_config() {
    let file = write_config(".json", r#"{"protocol": {"version": "extended"}}"#);
    let config = GatewayConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.protocol.version, ProtocolVersion::Extended);
}

#[test]
fn test_invalid_values_rejected() {
    let file = write_config(".yaml", "can:\n  bitrate: 115200\n");
    assert!(matches!(
        GatewayConfig::load(Some(file.path())),
        Err(GatewayError::ConfigError(_))
    ));

    let file = write_config(".yaml", "protocol:\n  version: v9\n");
    assert!(GatewayConfig::load(Some(file.path())).is_err());

    let file = write_config(".yaml", "can:\n  driver: replay\n");
    assert!(GatewayConfig::load(Some(file.path())).is_err());
}

#[test]
fn test_unsupported_extension() {
    let file = write_config(".ini", "[can]\nbitrate=250000\n");
    let err = GatewayConfig::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("Unsupported config format"));
}

#[test]
fn test_missing_file() {
    let err = GatewayConfig::load(Some(std::path::Path::new("/nonexistent/fcugw.yaml")))
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_bundled_sample_config_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/fcugw.yaml");
    let config = GatewayConfig::load(Some(&path)).unwrap();
    assert_eq!(config, GatewayConfig::default());
}
