//! Shared test fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use fcu_protocol::CanFrame;
use fcugw::error::{GatewayError, Result};
use fcugw::CanDriver;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Observable side of a [`MockDriver`]
#[derive(Clone, Default)]
pub struct MockBus {
    pub rx: Arc<Mutex<VecDeque<CanFrame>>>,
    pub tx: Arc<Mutex<Vec<CanFrame>>>,
    /// Fail the send after this many successful frames
    pub fail_after: Arc<Mutex<Option<usize>>>,
    pub closed: Arc<Mutex<bool>>,
}

impl MockBus {
    pub fn push_rx(&self, frame: CanFrame) {
        self.rx.lock().push_back(frame);
    }

    pub fn sent(&self) -> Vec<CanFrame> {
        self.tx.lock().clone()
    }

    pub fn fail_after(&self, frames: usize) {
        *self.fail_after.lock() = Some(frames);
    }
}

/// Scripted in-memory bus
pub struct MockDriver {
    bus: MockBus,
    is_open: bool,
}

impl MockDriver {
    pub fn new() -> (Self, MockBus) {
        let bus = MockBus::default();
        (
            Self {
                bus: bus.clone(),
                is_open: false,
            },
            bus,
        )
    }
}

#[async_trait]
impl CanDriver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&mut self, _bitrate: u32) -> Result<()> {
        self.is_open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.is_open = false;
        *self.bus.closed.lock() = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    async fn receive(&mut self, max_frames: usize) -> Result<Vec<CanFrame>> {
        if !self.is_open {
            return Err(GatewayError::NotOpen);
        }
        let mut rx = self.bus.rx.lock();
        let count = max_frames.min(rx.len());
        Ok(rx.drain(..count).collect())
    }

    async fn send(&mut self, frame: &CanFrame) -> Result<()> {
        if !self.is_open {
            return Err(GatewayError::NotOpen);
        }
        let mut tx = self.bus.tx.lock();
        if let Some(limit) = *self.bus.fail_after.lock() {
            if tx.len() >= limit {
                return Err(GatewayError::transport("bus-off"));
            }
        }
        tx.push(frame.clone());
        Ok(())
    }
}

/// `CanFrame::new` for known-good test input
pub fn frame(id: u32, data: &[u8]) -> CanFrame {
    CanFrame::new(id, data.to_vec()).unwrap_or_else(|e| panic!("bad test frame: {}", e))
}
