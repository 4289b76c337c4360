//! Controller simulator
//!
//! Emits one full telemetry cycle for the active table every period: the
//! stack voltage and current follow slow sine waves, the converter runs at
//! 95% efficiency, and the heartbeat counts tenths of a second. Payloads are
//! packed with the same field layouts the decoders read.

use super::CanDriver;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use fcu_protocol::bytes::{encode_field, inject_flag, FieldSpec};
use fcu_protocol::decoders::extended::{self, run_state};
use fcu_protocol::decoders::legacy;
use fcu_protocol::{CanFrame, ProtocolVersion};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Transmitted frames kept for inspection
const SENT_HISTORY: usize = 64;

const CONVERTER_EFFICIENCY: f64 = 0.95;
const DCDC_OUT_VOLTAGE: f64 = 24.0;

/// Simulated controller for bench runs without hardware
pub struct VirtualDriver {
    version: ProtocolVersion,
    period: Duration,
    started: Instant,
    last_emit: Option<Instant>,
    pending: VecDeque<CanFrame>,
    sent: VecDeque<CanFrame>,
    is_open: bool,
}

impl VirtualDriver {
    pub fn new(version: ProtocolVersion, period: Duration) -> Self {
        Self {
            version,
            period,
            started: Instant::now(),
            last_emit: None,
            pending: VecDeque::new(),
            sent: VecDeque::new(),
            is_open: false,
        }
    }

    /// Most recent transmitted frames, oldest first
    pub fn sent_frames(&self) -> Vec<CanFrame> {
        self.sent.iter().cloned().collect()
    }

    /// Telemetry cycle at `t` seconds after start
    pub fn cycle(&self, t: f64) -> Vec<CanFrame> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let payloads = match self.version {
            ProtocolVersion::Legacy => legacy_cycle(t),
            ProtocolVersion::Extended => extended_cycle(t),
        };
        payloads
            .into_iter()
            .map(|(id, data)| CanFrame {
                id,
                data: data.to_vec(),
                timestamp_ms: now_ms,
                is_extended: true,
            })
            .collect()
    }
}

struct Sample {
    heartbeat: u8,
    stack_v: f64,
    stack_i: f64,
    dcdc_i: f64,
    stack_temp: f64,
}

fn sample(t: f64) -> Sample {
    let stack_v = 150.0 + 50.0 * (0.5 * t).sin();
    let stack_i = 200.0 + 100.0 * (0.3 * t).sin();
    let dcdc_i = stack_v * stack_i * CONVERTER_EFFICIENCY / DCDC_OUT_VOLTAGE;
    Sample {
        heartbeat: ((t * 10.0) as u64 % 256) as u8,
        stack_v,
        stack_i,
        dcdc_i,
        stack_temp: 60.0 + 5.0 * (0.1 * t).sin(),
    }
}

fn pack(fields: &[(FieldSpec, f64)]) -> [u8; 8] {
    let mut payload = [0u8; 8];
    for (spec, value) in fields {
        encode_field(&mut payload, spec, *value);
    }
    payload
}

fn legacy_cycle(t: f64) -> Vec<(u32, [u8; 8])> {
    let s = sample(t);
    let mut status = [0u8; 8];
    status[0] = s.heartbeat;
    status[1] = 0x02;

    let power = pack(&[
        (legacy::STACK_VOLTAGE, s.stack_v),
        (legacy::STACK_CURRENT, s.stack_i),
        (legacy::DCDC_OUT_VOLTAGE, DCDC_OUT_VOLTAGE),
        (legacy::DCDC_OUT_CURRENT, s.dcdc_i),
    ]);
    let sensors = pack(&[
        (legacy::STACK_TEMP, s.stack_temp),
        (legacy::AMBIENT_TEMP, 25.0),
        (legacy::H2_CYLINDER_PRESSURE, 12_000.0),
        (legacy::H2_INLET_PRESSURE, 800.0),
        (legacy::H2_CONCENTRATION, 0.5),
    ]);
    let mut io = pack(&[(legacy::FAN1_DUTY, 60.0), (legacy::DCDC_MOS_TEMP, 45.0)]);
    io[0] = [0, 4].iter().fold(0u8, |acc, &bit| inject_flag(acc, bit, true));

    vec![
        (legacy::STATUS_ID, status),
        (legacy::POWER_ID, power),
        (legacy::SENSORS_ID, sensors),
        (legacy::IO_ID, io),
    ]
}

fn extended_cycle(t: f64) -> Vec<(u32, [u8; 8])> {
    let s = sample(t);
    let mut status = pack(&[
        (extended::HEARTBEAT, f64::from(s.heartbeat)),
        (extended::STACK_VOLTAGE, s.stack_v),
        (extended::STACK_CURRENT, s.stack_i),
        (extended::PUMP_SPEED, 55.0),
    ]);
    status[1] = run_state::RUNNING << 2;
    status[7] = 0x01;

    let dcdc = pack(&[
        (extended::DCDC_OUT_VOLTAGE, DCDC_OUT_VOLTAGE),
        (extended::DCDC_OUT_CURRENT, s.dcdc_i),
        (extended::DCDC_IN_VOLTAGE, s.stack_v),
        (extended::DCDC_IN_CURRENT, s.stack_i),
    ]);
    let h2_pressure = pack(&[
        (extended::H2_HIGH_PRESSURE, 12_000.0),
        (extended::H2_INLET_PRESSURE, 180.0),
        (extended::H2_OUTLET_PRESSURE, 150.0),
        (extended::H2_INLET_FLOW, s.stack_i * 0.25),
    ]);
    let h2_loop = pack(&[
        (extended::H2_CIRCULATION_SPEED, 3_000.0),
        (extended::H2_INLET_TEMP, 30.0),
        (extended::H2_SEPARATOR_PRESSURE, 140.0),
        (extended::H2_CONCENTRATION, 45.0),
        (extended::CONDUCTIVITY, 1.2),
        (extended::DCDC_TEMP, 45.0),
    ]);
    let air = pack(&[
        (extended::AIR_INLET_PRESSURE, 160.0),
        (extended::AIR_OUTLET_PRESSURE, 140.0),
        (extended::AIR_INLET_TEMP, 25.0),
        (extended::AIR_OUTLET_TEMP, 65.0),
        (extended::AIR_INLET_FLOW, s.stack_i * 1.5),
        (extended::AIR_HUMIDITY, 60.0),
        (extended::WATER_INLET_PRESSURE, 150.0),
    ]);
    let compressor = pack(&[
        (extended::COMPRESSOR_SET_SPEED, 60_000.0),
        (extended::COMPRESSOR_REAL_SPEED, 59_800.0),
        (extended::WATER_INLET_TEMP, s.stack_temp - 8.0),
        (extended::WATER_OUTLET_TEMP, s.stack_temp),
        (extended::WATER_AUX_OUTLET_TEMP, 40.0),
        (extended::WATER_AUX_COMP_TEMP, 50.0),
    ]);
    // h2 high valve, circulation pump, compressor, main pump, main fan,
    // coolant level OK, PTC off
    let actuators = [0b0000_1001, 0b0011_0100, 0b0000_0001, 50, 80, 75, 20, 60];
    let faults = [0u8; 8];

    vec![
        (extended::STACK_STATUS_ID, status),
        (extended::DCDC_ID, dcdc),
        (extended::H2_PRESSURE_ID, h2_pressure),
        (extended::H2_LOOP_ID, h2_loop),
        (extended::AIR_ID, air),
        (extended::COMPRESSOR_ID, compressor),
        (extended::ACTUATOR_ID, actuators),
        (extended::FAULT_ID, faults),
    ]
}

#[async_trait]
impl CanDriver for VirtualDriver {
    fn name(&self) -> &str {
        "virtual"
    }

    async fn open(&mut self, bitrate: u32) -> Result<()> {
        self.started = Instant::now();
        self.last_emit = None;
        self.pending.clear();
        self.is_open = true;
        info!(
            "Virtual CAN opened: {} table, {} bit/s, period {:?}",
            self.version, bitrate, self.period
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.is_open = false;
        self.pending.clear();
        debug!("Virtual CAN closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    async fn receive(&mut self, max_frames: usize) -> Result<Vec<CanFrame>> {
        if !self.is_open {
            return Err(GatewayError::NotOpen);
        }

        let now = Instant::now();
        let due = self
            .last_emit
            .map_or(true, |last| now.duration_since(last) >= self.period);
        if due {
            self.last_emit = Some(now);
            let t = now.duration_since(self.started).as_secs_f64();
            self.pending.extend(self.cycle(t));
        }

        let count = max_frames.min(self.pending.len());
        Ok(self.pending.drain(..count).collect())
    }

    async fn send(&mut self, frame: &CanFrame) -> Result<()> {
        if !self.is_open {
            return Err(GatewayError::NotOpen);
        }
        debug!("Virtual TX {}", frame);
        if self.sent.len() == SENT_HISTORY {
            self.sent.pop_front();
        }
        self.sent.push_back(frame.clone());
        Ok(())
    }
}
