//! candump log playback
//!
//! Reads `candump -l` style lines, `(1700000000.123456) can0 1824A7A4#05089600C8001000`,
//! and releases each frame once its offset from the first timestamp has
//! elapsed on the wall clock. Lines without a timestamp are released
//! immediately. With `looping` the log restarts after the last frame.

use super::CanDriver;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use fcu_protocol::CanFrame;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One log line: seconds offset (if any) and the frame
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayEntry {
    pub timestamp: Option<f64>,
    pub frame: CanFrame,
}

/// Parse one candump line; `Ok(None)` for blank lines and `#` comments
pub fn parse_candump_line(line: &str) -> Result<Option<ReplayEntry>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut timestamp = None;
    let mut frame_token = None;
    for token in line.split_whitespace() {
        if let Some(ts) = token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            let seconds = ts
                .parse::<f64>()
                .map_err(|_| GatewayError::transport(format!("Bad timestamp: {}", token)))?;
            timestamp = Some(seconds);
        } else if token.contains('#') {
            frame_token = Some(token);
        }
    }

    let token =
        frame_token.ok_or_else(|| GatewayError::transport(format!("No frame in line: {}", line)))?;
    let (id_hex, data_hex) = token
        .split_once('#')
        .ok_or_else(|| GatewayError::transport(format!("Bad frame: {}", token)))?;

    if data_hex.starts_with('R') {
        return Err(GatewayError::transport(format!(
            "Remote frames are not supported: {}",
            token
        )));
    }

    let id = u32::from_str_radix(id_hex, 16)
        .map_err(|_| GatewayError::transport(format!("Bad identifier: {}", id_hex)))?;
    let data = parse_hex_payload(data_hex)?;
    let frame = CanFrame::new(id, data)?;

    Ok(Some(ReplayEntry { timestamp, frame }))
}

fn parse_hex_payload(hex: &str) -> Result<Vec<u8>> {
    let hex: String = hex.chars().filter(|c| *c != '.').collect();
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return Err(GatewayError::transport(format!(
            "Malformed payload: {}",
            hex
        )));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| GatewayError::transport(format!("Bad payload byte in {}", hex)))
        })
        .collect()
}

/// Parse a whole log, skipping malformed lines with a warning
pub fn parse_candump(content: &str) -> Vec<ReplayEntry> {
    content
        .lines()
        .enumerate()
        .filter_map(|(number, line)| match parse_candump_line(line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Replay line {} skipped: {}", number + 1, e);
                None
            },
        })
        .collect()
}

/// Plays a candump log as if it were the bus
pub struct ReplayDriver {
    path: PathBuf,
    looping: bool,
    entries: Vec<ReplayEntry>,
    cursor: usize,
    started: Instant,
    first_timestamp: Option<f64>,
    sent: u64,
    is_open: bool,
}

impl ReplayDriver {
    pub fn new(path: impl Into<PathBuf>, looping: bool) -> Self {
        Self {
            path: path.into(),
            looping,
            entries: Vec::new(),
            cursor: 0,
            started: Instant::now(),
            first_timestamp: None,
            sent: 0,
            is_open: false,
        }
    }

    /// Build from already parsed entries (no file access on open)
    pub fn from_entries(entries: Vec<ReplayEntry>, looping: bool) -> Self {
        let mut driver = Self::new(PathBuf::new(), looping);
        driver.entries = entries;
        driver
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frames accepted by `send`
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    fn rewind(&mut self) {
        self.cursor = 0;
        self.started = Instant::now();
        self.first_timestamp = self.entries.iter().find_map(|e| e.timestamp);
    }

    fn is_due(&self, entry: &ReplayEntry, elapsed: Duration) -> bool {
        match (entry.timestamp, self.first_timestamp) {
            (Some(ts), Some(first)) => ts - first <= elapsed.as_secs_f64(),
            _ => true,
        }
    }
}

#[async_trait]
impl CanDriver for ReplayDriver {
    fn name(&self) -> &str {
        "replay"
    }

    async fn open(&mut self, bitrate: u32) -> Result<()> {
        if !self.path.as_os_str().is_empty() {
            let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                GatewayError::transport(format!("Cannot read {}: {}", self.path.display(), e))
            })?;
            self.entries = parse_candump(&content);
        }
        if self.entries.is_empty() {
            return Err(GatewayError::transport("Replay log contains no frames"));
        }

        self.rewind();
        self.is_open = true;
        info!(
            "Replay opened: {} frames from {}, {} bit/s, loop={}",
            self.entries.len(),
            self.path.display(),
            bitrate,
            self.looping
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.is_open = false;
        debug!("Replay closed at frame {}/{}", self.cursor, self.entries.len());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    async fn receive(&mut self, max_frames: usize) -> Result<Vec<CanFrame>> {
        if !self.is_open {
            return Err(GatewayError::NotOpen);
        }

        if self.cursor >= self.entries.len() {
            if !self.looping {
                return Ok(Vec::new());
            }
            debug!("Replay restarting");
            self.rewind();
        }

        let elapsed = self.started.elapsed();
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut batch = Vec::new();
        while batch.len() < max_frames && self.cursor < self.entries.len() {
            let entry = &self.entries[self.cursor];
            if !self.is_due(entry, elapsed) {
                break;
            }
            batch.push(entry.frame.clone().with_timestamp(now_ms));
            self.cursor += 1;
        }
        Ok(batch)
    }

    async fn send(&mut self, frame: &CanFrame) -> Result<()> {
        if !self.is_open {
            return Err(GatewayError::NotOpen);
        }
        debug!("Replay TX (discarded) {}", frame);
        self.sent += 1;
        Ok(())
    }
}
