//! Fuel-cell control unit CAN gateway
//!
//! Bridges a CAN bus carrying FCU telemetry to in-process subscribers and an
//! HTTP API. Frames are decoded by `fcu-protocol` into one shared machine
//! state; snapshots are fanned out at a fixed rate; operator control requests
//! are encoded and transmitted back onto the bus.

pub mod api;
pub mod bootstrap;
pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod shutdown;
pub mod transport;

pub use bridge::{Gateway, SendReport, StatsSnapshot};
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use transport::{create_driver, CanDriver};
