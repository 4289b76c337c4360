//! Lock-guarded machine state for one controller session
//!
//! A single receive task drives [`SharedMachineState::dispatch`], one frame at
//! a time, under the write lock. Any number of consumers may call
//! [`SharedMachineState::snapshot`] concurrently: each takes one read lock,
//! copies the whole state out, and exports after releasing it, so a reader
//! never observes a half-applied frame.

use crate::frame::CanFrame;
use crate::registry::{DispatchOutcome, ProtocolTable, ProtocolVersion};
use crate::snapshot::MachineSnapshot;
use crate::state::MachineState;
use crate::time::{SystemTimeProvider, TimeProvider};
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable handle; clones share the same session state
#[derive(Clone)]
pub struct SharedMachineState {
    state: Arc<RwLock<MachineState>>,
    table: Arc<ProtocolTable>,
    clock: Arc<dyn TimeProvider>,
}

impl std::fmt::Debug for SharedMachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMachineState")
            .field("version", &self.table.version())
            .field("connected", &self.state.read().connected)
            .finish()
    }
}

impl SharedMachineState {
    pub fn new(version: ProtocolVersion) -> Self {
        Self::with_clock(version, Arc::new(SystemTimeProvider))
    }

    pub fn with_clock(version: ProtocolVersion, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            state: Arc::new(RwLock::new(MachineState::new())),
            table: Arc::new(ProtocolTable::new(version)),
            clock,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.table.version()
    }

    pub fn table(&self) -> &ProtocolTable {
        &self.table
    }

    /// Decode one frame into the live state
    pub fn dispatch(&self, frame: &CanFrame) -> DispatchOutcome {
        let now_ms = self.clock.now_millis();
        let mut state = self.state.write();
        self.table.dispatch(&mut state, frame, now_ms)
    }

    /// Copy-out export with derived fields recomputed
    pub fn snapshot(&self) -> MachineSnapshot {
        let copy = self.state.read().clone();
        MachineSnapshot::export(&copy, self.table.version())
    }

    /// Run a closure against a consistent view of the raw state
    pub fn read<R>(&self, f: impl FnOnce(&MachineState) -> R) -> R {
        f(&self.state.read())
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    /// Restore defaults at session end
    pub fn reset(&self) {
        self.state.write().reset();
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::decoders::extended;
    use crate::time::FixedTimeProvider;

    fn shared() -> SharedMachineState {
        SharedMachineState::with_clock(
            ProtocolVersion::Extended,
            Arc::new(FixedTimeProvider::new(1_000)),
        )
    }

    #[test]
    fn test_dispatch_then_snapshot() {
        let state = shared();
        let frame = CanFrame::new(
            extended::STACK_STATUS_ID,
            vec![0x05, 0x08, 0x96, 0x00, 0xC8, 0x00, 0x10, 0x00],
        )
        .unwrap();

        assert!(state.dispatch(&frame).is_decoded());
        let snapshot = state.snapshot();
        assert!(snapshot.connected);
        assert_eq!(snapshot.last_update, 1_000);
        assert_eq!(snapshot.power.stack_power, 30.0);
        assert_eq!(state.read(|s| s.status.heartbeat), 5);
    }

    #[test]
    fn test_clones_share_session() {
        let state = shared();
        let reader = state.clone();
        let frame = CanFrame::new(extended::FAULT_ID, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        state.dispatch(&frame);
        assert!(reader.is_connected());
        assert_eq!(reader.snapshot().faults, [1, 2, 3, 4, 5, 6, 7, 8]);

        reader.reset();
        assert!(!state.is_connected());
    }

    #[test]
    fn test_concurrent_readers_see_consistent_power() {
        let state = shared();
        let writer = state.clone();

        let handle = std::thread::spawn(move || {
            for i in 0..500u16 {
                let v = (100 + i % 50).to_le_bytes();
                let a = (200 - i % 50).to_le_bytes();
                let frame = CanFrame::new(
                    extended::STACK_STATUS_ID,
                    vec![0, 0x08, v[0], v[1], a[0], a[1], 0, 0],
                )
                .unwrap();
                writer.dispatch(&frame);
            }
        });

        for _ in 0..500 {
            let snapshot = state.snapshot();
            let expected = snapshot.power.stack_voltage * snapshot.power.stack_current / 1000.0;
            assert!((snapshot.power.stack_power - expected).abs() < 0.01);
            // Raw state always carries a product matching its inputs
            state.read(|s| {
                let p = s.power.stack_voltage() * s.power.stack_current() / 1000.0;
                assert_eq!(s.power.stack_power(), p);
            });
        }
        handle.join().unwrap();
    }
}
