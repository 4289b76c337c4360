//! Bus bridge
//!
//! Owns the driver and the shared machine state. Three paths run against it:
//! - receive loop: poll a batch, dispatch every frame in arrival order
//! - broadcast loop: publish a snapshot at a fixed rate to all subscribers
//! - command path: encode a control request and send the batch in order,
//!   stopping at the first transport failure
//!
//! The driver sits behind one async mutex, so a command batch is never
//! interleaved with a receive poll.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::transport::CanDriver;
use fcu_protocol::{
    encode_command, CanFrame, ControlCommand, DispatchOutcome, MachineSnapshot, ProtocolVersion,
    SharedMachineState,
};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Decoded frames between progress log lines
const HEARTBEAT_LOG_EVERY: u64 = 100;

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct DispatchStats {
    received: u64,
    decoded: u64,
    truncated: u64,
    unknown: u64,
    unknown_ids: FxHashSet<u32>,
    commands_sent: u64,
    command_frames_sent: u64,
    command_failures: u64,
}

/// Counters exposed on the stats endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub protocol: ProtocolVersion,
    pub driver: String,
    pub connected: bool,
    pub frames_received: u64,
    pub decoded: u64,
    pub truncated: u64,
    pub unknown: u64,
    /// Distinct unrecognized identifiers, sorted, `0x` hex
    pub unknown_ids: Vec<String>,
    pub commands_sent: u64,
    pub command_frames_sent: u64,
    pub command_failures: u64,
    pub subscribers: usize,
}

/// Result of one command transmission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReport {
    /// Frames that went out, in batch order
    pub sent: usize,
    pub total: usize,
    /// Failure that stopped the batch
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<GatewayError>,
}

fn serialize_error<S: Serializer>(
    error: &Option<GatewayError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.collect_str(err),
        None => serializer.serialize_none(),
    }
}

impl SendReport {
    pub fn is_complete(&self) -> bool {
        self.sent == self.total && self.error.is_none()
    }
}

pub struct Gateway {
    state: SharedMachineState,
    driver: tokio::sync::Mutex<Box<dyn CanDriver>>,
    driver_name: String,
    snapshots: broadcast::Sender<Arc<MachineSnapshot>>,
    stats: Mutex<DispatchStats>,
    bitrate: u32,
    rx_batch_size: usize,
    poll_interval: Duration,
    broadcast_interval: Duration,
}

impl Gateway {
    pub fn new(config: &GatewayConfig, driver: Box<dyn CanDriver>) -> Result<Self> {
        Self::with_state(
            config,
            driver,
            SharedMachineState::new(config.protocol.version),
        )
    }

    /// Use an existing session (tests inject a fixed clock this way)
    ///
    /// Rejects a config that fails [`GatewayConfig::validate`].
    pub fn with_state(
        config: &GatewayConfig,
        driver: Box<dyn CanDriver>,
        state: SharedMachineState,
    ) -> Result<Self> {
        config.validate()?;
        let (snapshots, _) = broadcast::channel(config.broadcast.capacity);
        Ok(Self {
            state,
            driver_name: driver.name().to_string(),
            driver: tokio::sync::Mutex::new(driver),
            snapshots,
            stats: Mutex::new(DispatchStats::default()),
            bitrate: config.can.bitrate,
            rx_batch_size: config.can.rx_batch_size,
            poll_interval: config.poll_interval(),
            broadcast_interval: config.broadcast_interval(),
        })
    }

    pub fn state(&self) -> &SharedMachineState {
        &self.state
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.state.version()
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// New snapshot receiver; lagging receivers skip ahead
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<MachineSnapshot>> {
        self.snapshots.subscribe()
    }

    pub async fn open(&self) -> Result<()> {
        let mut driver = self.driver.lock().await;
        driver.open(self.bitrate).await?;
        info!(
            "CAN bridge ready: driver={}, protocol={}, {} decoders",
            self.driver_name,
            self.protocol(),
            self.state.table().len()
        );
        Ok(())
    }

    /// One receive poll; returns the number of frames processed
    pub async fn poll_once(&self) -> Result<usize> {
        let frames = {
            let mut driver = self.driver.lock().await;
            driver.receive(self.rx_batch_size).await?
        };
        for frame in &frames {
            self.process_frame(frame);
        }
        Ok(frames.len())
    }

    /// Dispatch one frame and account for the outcome
    pub fn process_frame(&self, frame: &CanFrame) -> DispatchOutcome {
        let outcome = self.state.dispatch(frame);

        let mut stats = self.stats.lock();
        stats.received += 1;
        match &outcome {
            DispatchOutcome::Decoded { .. } => {
                stats.decoded += 1;
                if stats.decoded % HEARTBEAT_LOG_EVERY == 0 {
                    debug!(
                        "Bridge: {} decoded, {} truncated, {} unknown",
                        stats.decoded, stats.truncated, stats.unknown
                    );
                }
            },
            DispatchOutcome::Truncated {
                name,
                required,
                actual,
            } => {
                stats.truncated += 1;
                debug!(
                    "Dropped short {} frame 0x{:08X}: {} < {} bytes",
                    name, frame.id, actual, required
                );
            },
            DispatchOutcome::Unknown => {
                stats.unknown += 1;
                if stats.unknown_ids.insert(frame.id) {
                    debug!("Unknown identifier 0x{:08X}", frame.id);
                }
            },
        }
        outcome
    }

    /// Export and publish one snapshot; returns the receiver count
    pub fn publish_snapshot(&self) -> usize {
        let snapshot = Arc::new(self.state.snapshot());
        self.snapshots.send(snapshot).unwrap_or(0)
    }

    /// Encode and transmit a control request
    pub async fn send_command(&self, cmd: &ControlCommand) -> SendReport {
        let frames = encode_command(cmd, self.protocol());
        let mut report = SendReport {
            sent: 0,
            total: frames.len(),
            error: None,
        };

        {
            let mut driver = self.driver.lock().await;
            for frame in &frames {
                match driver.send(frame).await {
                    Ok(()) => report.sent += 1,
                    Err(e) => {
                        report.error = Some(e);
                        break;
                    },
                }
            }
        }

        let mut stats = self.stats.lock();
        stats.command_frames_sent += report.sent as u64;
        if report.is_complete() {
            stats.commands_sent += 1;
            info!(
                "Command sent: mode={:?} command={:?} ({} frames)",
                cmd.mode, cmd.command, report.sent
            );
        } else {
            stats.command_failures += 1;
            warn!(
                "Command send stopped after {}/{} frames: {}",
                report.sent,
                report.total,
                report
                    .error
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string)
            );
        }
        report
    }

    pub fn stats(&self) -> StatsSnapshot {
        let stats = self.stats.lock();
        let mut unknown: Vec<u32> = stats.unknown_ids.iter().copied().collect();
        unknown.sort_unstable();
        StatsSnapshot {
            protocol: self.protocol(),
            driver: self.driver_name.clone(),
            connected: self.state.is_connected(),
            frames_received: stats.received,
            decoded: stats.decoded,
            truncated: stats.truncated,
            unknown: stats.unknown,
            unknown_ids: unknown.iter().map(|id| format!("0x{:08X}", id)).collect(),
            commands_sent: stats.commands_sent,
            command_frames_sent: stats.command_frames_sent,
            command_failures: stats.command_failures,
            subscribers: self.snapshots.receiver_count(),
        }
    }

    /// Poll until cancelled
    pub async fn run_receive_loop(&self, token: CancellationToken) {
        info!("Receive loop started ({:?} poll)", self.poll_interval);
        loop {
            let pause = match self.poll_once().await {
                Ok(_) => self.poll_interval,
                Err(e) => {
                    warn!("CAN receive failed: {}", e);
                    RECEIVE_ERROR_BACKOFF
                },
            };
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(pause) => {},
            }
        }
        info!("Receive loop stopped");
    }

    /// Publish snapshots until cancelled
    pub async fn run_broadcast_loop(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.broadcast_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!("Broadcast loop started ({:?})", self.broadcast_interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    self.publish_snapshot();
                },
            }
        }
        info!("Broadcast loop stopped");
    }

    /// Close the driver and clear the session
    pub async fn shutdown(&self) {
        {
            let mut driver = self.driver.lock().await;
            if driver.is_open() {
                if let Err(e) = driver.close().await {
                    error!("Failed to close {} driver: {}", self.driver_name, e);
                }
            }
        }
        self.state.reset();
        info!("CAN bridge shut down");
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("driver", &self.driver_name)
            .field("protocol", &self.protocol())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::transport::VirtualDriver;
    use tracing_test::traced_test;

    fn virtual_gateway() -> Gateway {
        let config = GatewayConfig::default();
        let driver = VirtualDriver::new(config.protocol.version, Duration::from_millis(100));
        Gateway::new(&config, Box::new(driver)).unwrap()
    }

    #[test]
    #[traced_test]
    fn test_unknown_identifier_logged_once() {
        let gw = virtual_gateway();
        let frame = CanFrame::new(0x0CF00400, vec![0; 8]).unwrap();
        gw.process_frame(&frame);
        gw.process_frame(&frame);

        assert!(logs_contain("Unknown identifier 0x0CF00400"));
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("Unknown identifier"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one log line, got {}", n)),
            }
        });
        assert_eq!(gw.stats().unknown, 2);
    }

    #[tokio::test]
    async fn test_virtual_driver_session() {
        let gw = virtual_gateway();
        gw.open().await.unwrap();
        assert_eq!(gw.poll_once().await.unwrap(), 8);
        assert!(gw.state().is_connected());
        assert_eq!(gw.stats().decoded, 8);

        let report = gw.send_command(&ControlCommand::default()).await;
        assert!(report.is_complete());
        gw.shutdown().await;
    }

    #[test]
    fn test_send_report_completeness() {
        let partial = SendReport {
            sent: 1,
            total: 3,
            error: Some(GatewayError::transport("bus-off")),
        };
        assert!(!partial.is_complete());
        let value = serde_json::to_value(&partial).unwrap();
        assert_eq!(value["error"], "Transport error: bus-off");
    }
}
