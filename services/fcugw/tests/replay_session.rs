//! End-to-end: candump file → replay driver → bridge → snapshot

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use fcu_protocol::ProtocolVersion;
use fcugw::config::DriverKind;
use fcugw::{create_driver, Gateway, GatewayConfig};
use std::io::Write;

const CAPTURE: &str = "\
# bench capture, extended firmware
(1700000000.000000) can0 1824A7A4#05089600C8001000
(1700000000.001000) can0 1825A7A4#F000DC051C066400
(1700000000.002000) can0 182BA7A4#0700000000000000
(1700000000.003000) can0 18FF05F0#00
(1700000000.004000) can0 1826A7A4#2EE0
";

#[tokio::test]
async fn test_replayed_capture_builds_state() {
    let mut file = tempfile::Builder::new().suffix(".log").tempfile().unwrap();
    file.write_all(CAPTURE.as_bytes()).unwrap();
    file.flush().unwrap();

    let mut config = GatewayConfig::default();
    config.can.driver = DriverKind::Replay;
    config.can.replay_file = Some(file.path().to_path_buf());
    config.protocol.version = ProtocolVersion::Extended;

    let gateway = Gateway::new(&config, create_driver(&config).unwrap()).unwrap();
    assert_eq!(gateway.driver_name(), "replay");
    gateway.open().await.unwrap();

    // The capture spans 4 ms; give the pacing a moment
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(gateway.poll_once().await.unwrap(), 5);

    let stats = gateway.stats();
    assert_eq!(stats.decoded, 3);
    assert_eq!(stats.truncated, 1);
    assert_eq!(stats.unknown, 1);

    let snapshot = gateway.state().snapshot();
    assert!(snapshot.connected);
    assert_eq!(snapshot.status.heartbeat, 5);
    assert_eq!(snapshot.power.stack_voltage, 150.0);
    // 24.0 V × 150.0 A out of 30 kW in
    assert_eq!(snapshot.power.dcf_out_voltage, 24.0);
    assert_eq!(snapshot.power.dcf_out_current, 150.0);
    assert_eq!(snapshot.power.dcf_efficiency, 12.0);
    assert_eq!(snapshot.faults[0], 7);
    // Truncated hydrogen frame ignored
    assert_eq!(snapshot.h2.high_pressure, 0.0);

    gateway.shutdown().await;
    assert!(!gateway.state().is_connected());
}
