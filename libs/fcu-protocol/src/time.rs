//! Time provider abstraction
//!
//! Dispatch stamps `last_update` through this trait so tests can pin the clock.

/// Source of wall-clock timestamps
pub trait TimeProvider: Send + Sync + 'static {
    /// Current timestamp in milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// System clock via chrono
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Returns a predetermined timestamp, for deterministic tests
#[derive(Clone, Copy, Debug)]
pub struct FixedTimeProvider {
    timestamp_ms: i64,
}

impl FixedTimeProvider {
    pub fn new(timestamp_ms: i64) -> Self {
        Self { timestamp_ms }
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now_millis(&self) -> i64 {
        self.timestamp_ms
    }
}
