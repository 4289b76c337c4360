//! CAN transport drivers
//!
//! The gateway talks to the bus through [`CanDriver`]: open at a bit rate,
//! poll a finite batch of received frames, send one frame at a time. Two
//! backends ship with the service: a controller simulator and a candump log
//! player. Physical adapters plug in behind the same trait.

mod replay;
mod virtual_driver;

pub use replay::{parse_candump, parse_candump_line, ReplayDriver, ReplayEntry};
pub use virtual_driver::VirtualDriver;

use crate::config::{DriverKind, GatewayConfig};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use fcu_protocol::CanFrame;

/// Frame-level bus access
#[async_trait]
pub trait CanDriver: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    async fn open(&mut self, bitrate: u32) -> Result<()>;

    async fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Return up to `max_frames` frames received since the last poll
    ///
    /// An empty batch means nothing arrived; it is not an error.
    async fn receive(&mut self, max_frames: usize) -> Result<Vec<CanFrame>>;

    /// Transmit one frame
    async fn send(&mut self, frame: &CanFrame) -> Result<()>;
}

/// Build the configured backend (not yet opened)
pub fn create_driver(config: &GatewayConfig) -> Result<Box<dyn CanDriver>> {
    match config.can.driver {
        DriverKind::Virtual => Ok(Box::new(VirtualDriver::new(
            config.protocol.version,
            std::time::Duration::from_millis(config.can.sim_period_ms),
        ))),
        DriverKind::Replay => {
            let path = config.can.replay_file.clone().ok_or_else(|| {
                GatewayError::config("can.replay_file is required for the replay driver")
            })?;
            Ok(Box::new(ReplayDriver::new(path, config.can.replay_loop)))
        },
    }
}
