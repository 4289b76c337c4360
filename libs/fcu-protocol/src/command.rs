//! Operator command model and control-frame encoder
//!
//! Encoding is stateless. Out-of-range setpoints are clamped, never rejected,
//! so a single bad value cannot block a control session. The encoder always
//! produces the complete ordered batch; partial transmission is the caller's
//! concern.

use crate::bytes::{encode_field, inject_flag, insert_bits};
use crate::error::{ProtocolError, Result};
use crate::frame::{CanFrame, MAX_PAYLOAD_LEN};
use crate::registry::ProtocolVersion;
use serde::{Deserialize, Serialize};

// ============================================================================
// Wire layout
// ============================================================================

/// Legacy single control frame
pub const LEGACY_CONTROL_ID: u32 = 0x18FF10A0;

/// Extended control batch, in transmission order
pub const SYSTEM_COMMAND_ID: u32 = 0x1830A4A7;
pub const ACTUATOR_SETPOINT_ID: u32 = 0x1831A4A7;
pub const CONVERTER_SETPOINT_ID: u32 = 0x1832A4A7;

/// Mode occupies bits[1:0] of byte 0, command bits[4:2]
const MODE_START_BIT: u16 = 0;
const MODE_BITS: u8 = 2;
const COMMAND_START_BIT: u16 = 2;
const COMMAND_BITS: u8 = 3;

/// Override flag positions in byte 1 (manual mode only)
pub mod override_bit {
    pub const INLET_VALVE: u8 = 0;
    pub const PURGE_VALVE: u8 = 1;
    pub const HEATER: u8 = 2;
    pub const FAN1: u8 = 3;
    pub const FAN2: u8 = 4;
    pub const COOLANT_PUMP: u8 = 5;
    pub const COMPRESSOR: u8 = 6;
    pub const CIRCULATION_PUMP: u8 = 7;
}

pub mod legacy_layout {
    use crate::bytes::FieldSpec;

    pub const FAN1_TARGET: FieldSpec = FieldSpec::u8(2);
    pub const TARGET_VOLTAGE: FieldSpec = FieldSpec::u16_le(3).scaled(0.1, 0.0);
    pub const TARGET_CURRENT: FieldSpec = FieldSpec::u16_le(5).scaled(0.1, 0.0);
}

pub mod extended_layout {
    use crate::bytes::FieldSpec;

    // 0x1831A4A7
    pub const FAN1_TARGET: FieldSpec = FieldSpec::u8(0);
    pub const FAN2_TARGET: FieldSpec = FieldSpec::u8(1);
    pub const THERMOSTAT_TARGET: FieldSpec = FieldSpec::u8(2);
    pub const AIR_INLET_THROTTLE: FieldSpec = FieldSpec::u8(3);
    pub const AIR_OUTLET_THROTTLE: FieldSpec = FieldSpec::u8(4);
    pub const COMPRESSOR_SPEED: FieldSpec = FieldSpec::u16_be(5);
    pub const COOLANT_PUMP: FieldSpec = FieldSpec::u8(7);

    // 0x1832A4A7
    pub const TARGET_VOLTAGE: FieldSpec = FieldSpec::u16_le(0).scaled(0.1, 0.0);
    pub const TARGET_CURRENT: FieldSpec = FieldSpec::u16_le(2).scaled(0.1, 0.0);
    pub const POWER_LIMIT: FieldSpec = FieldSpec::u16_le(4).scaled(0.1, 0.0);
}

// ============================================================================
// Command model
// ============================================================================

/// Operating mode: "AUTO"/"MANUAL" or 1/0 on input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "ModeRepr")]
pub enum OperatingMode {
    #[default]
    Manual,
    Auto,
}

impl OperatingMode {
    pub fn code(&self) -> u8 {
        match self {
            Self::Manual => 0,
            Self::Auto => 1,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Code(i64),
    Name(String),
}

impl From<ModeRepr> for OperatingMode {
    /// Anything other than AUTO / 1 selects manual operation
    fn from(repr: ModeRepr) -> Self {
        match repr {
            ModeRepr::Code(1) => Self::Auto,
            ModeRepr::Name(name) if name.trim().eq_ignore_ascii_case("auto") => Self::Auto,
            _ => Self::Manual,
        }
    }
}

/// Discrete system command
///
/// Input accepts the symbolic name or a numeric wire code. Numeric codes are
/// kept as given: the legacy frame sends the low 3 bits unchanged, the
/// extended frame clamps them to 0 none, 1 start, 2 stop, 3 reset,
/// 4 emergency stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "CommandRepr", into = "CommandRepr")]
pub enum Command {
    #[default]
    None,
    Start,
    Stop,
    Reset,
    EmergencyStop,
    /// Numeric code from a control client
    Code(i64),
}

impl Command {
    /// 3-bit code in the extended system command frame
    ///
    /// Stop and reset are the adjacent codes 0b010 and 0b011.
    pub fn extended_code(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Start => 1,
            Self::Stop => 2,
            Self::Reset => 3,
            Self::EmergencyStop => 4,
            Self::Code(code) => (*code).clamp(0, 4) as u8,
        }
    }

    /// Code in the legacy control frame, where stop is the idle value
    ///
    /// Numeric codes go out as their low 3 bits.
    pub fn legacy_code(&self) -> u8 {
        match self {
            Self::None | Self::Stop => 0,
            Self::Start => 1,
            Self::Reset => 2,
            Self::EmergencyStop => 3,
            Self::Code(code) => (*code & 0x07) as u8,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CommandRepr {
    Index(i64),
    Name(String),
}

impl From<CommandRepr> for Command {
    fn from(repr: CommandRepr) -> Self {
        match repr {
            CommandRepr::Index(code) => Self::Code(code),
            CommandRepr::Name(name) => match name.trim().to_uppercase().as_str() {
                "START" => Self::Start,
                "STOP" => Self::Stop,
                "RESET" => Self::Reset,
                "ESTOP" | "E_STOP" | "EMERGENCY_STOP" | "EMERGENCYSTOP" => Self::EmergencyStop,
                _ => Self::None,
            },
        }
    }
}

impl From<Command> for CommandRepr {
    fn from(command: Command) -> Self {
        let name = match command {
            Command::None => "NONE",
            Command::Start => "START",
            Command::Stop => "STOP",
            Command::Reset => "RESET",
            Command::EmergencyStop => "EMERGENCY_STOP",
            Command::Code(code) => return Self::Index(code),
        };
        Self::Name(name.to_string())
    }
}

/// Operator intent as received from a control client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlCommand {
    pub mode: OperatingMode,
    pub command: Command,

    pub force_inlet_valve: bool,
    pub force_purge_valve: bool,
    pub force_heater: bool,
    pub force_fan1: bool,
    pub force_fan2: bool,
    pub force_coolant_pump: bool,
    pub force_compressor: bool,
    pub force_circulation_pump: bool,

    /// Percent
    pub fan1_target_speed: f64,
    pub fan2_target_speed: f64,
    pub thermostat_target: f64,
    pub air_inlet_throttle_target: f64,
    pub air_outlet_throttle_target: f64,
    /// rpm
    pub compressor_target_speed: f64,
    pub coolant_pump_target: f64,

    /// DC/DC output setpoints (V, A) and power limit (kW)
    pub dcf_target_voltage: f64,
    pub dcf_target_current: f64,
    pub power_limit: f64,
}

impl Default for ControlCommand {
    fn default() -> Self {
        Self {
            mode: OperatingMode::Manual,
            command: Command::None,
            force_inlet_valve: false,
            force_purge_valve: false,
            force_heater: false,
            force_fan1: false,
            force_fan2: false,
            force_coolant_pump: false,
            force_compressor: false,
            force_circulation_pump: false,
            fan1_target_speed: 50.0,
            fan2_target_speed: 0.0,
            thermostat_target: 0.0,
            air_inlet_throttle_target: 0.0,
            air_outlet_throttle_target: 0.0,
            compressor_target_speed: 0.0,
            coolant_pump_target: 0.0,
            dcf_target_voltage: 24.0,
            dcf_target_current: 5.0,
            power_limit: 0.0,
        }
    }
}

impl ControlCommand {
    /// Parse a command from its JSON mapping; missing fields take defaults
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ProtocolError::invalid_command(e.to_string()))
    }

    /// Override flags packed LSB-first; zero unless mode is manual
    pub fn override_byte(&self) -> u8 {
        if self.mode != OperatingMode::Manual {
            return 0;
        }
        let flags = [
            (override_bit::INLET_VALVE, self.force_inlet_valve),
            (override_bit::PURGE_VALVE, self.force_purge_valve),
            (override_bit::HEATER, self.force_heater),
            (override_bit::FAN1, self.force_fan1),
            (override_bit::FAN2, self.force_fan2),
            (override_bit::COOLANT_PUMP, self.force_coolant_pump),
            (override_bit::COMPRESSOR, self.force_compressor),
            (override_bit::CIRCULATION_PUMP, self.force_circulation_pump),
        ];
        flags
            .iter()
            .fold(0u8, |acc, &(bit, on)| inject_flag(acc, bit, on))
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Clamp a percentage setpoint to [0, 100]; NaN becomes 0
fn percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn mode_command_byte(payload: &mut [u8; MAX_PAYLOAD_LEN], mode: u8, command: u8) {
    insert_bits(payload, MODE_START_BIT, MODE_BITS, u64::from(mode));
    insert_bits(payload, COMMAND_START_BIT, COMMAND_BITS, u64::from(command));
}

/// Build the ordered control batch for one operator command
pub fn encode_command(cmd: &ControlCommand, version: ProtocolVersion) -> Vec<CanFrame> {
    match version {
        ProtocolVersion::Legacy => vec![encode_legacy(cmd)],
        ProtocolVersion::Extended => encode_extended(cmd).to_vec(),
    }
}

/// Single 0x18FF10A0 frame; only the first five override bits exist here
pub fn encode_legacy(cmd: &ControlCommand) -> CanFrame {
    let mut payload = [0u8; MAX_PAYLOAD_LEN];
    mode_command_byte(&mut payload, cmd.mode.code(), cmd.command.legacy_code());
    payload[1] = cmd.override_byte() & 0x1F;
    encode_field(&mut payload, &legacy_layout::FAN1_TARGET, percent(cmd.fan1_target_speed));
    encode_field(&mut payload, &legacy_layout::TARGET_VOLTAGE, cmd.dcf_target_voltage);
    encode_field(&mut payload, &legacy_layout::TARGET_CURRENT, cmd.dcf_target_current);
    CanFrame::from_payload(LEGACY_CONTROL_ID, payload)
}

/// System command, actuator setpoints, converter parameters (in that order)
pub fn encode_extended(cmd: &ControlCommand) -> [CanFrame; 3] {
    let mut system = [0u8; MAX_PAYLOAD_LEN];
    mode_command_byte(&mut system, cmd.mode.code(), cmd.command.extended_code());
    system[1] = cmd.override_byte();

    let mut actuators = [0u8; MAX_PAYLOAD_LEN];
    encode_field(&mut actuators, &extended_layout::FAN1_TARGET, percent(cmd.fan1_target_speed));
    encode_field(&mut actuators, &extended_layout::FAN2_TARGET, percent(cmd.fan2_target_speed));
    encode_field(&mut actuators, &extended_layout::THERMOSTAT_TARGET, percent(cmd.thermostat_target));
    encode_field(
        &mut actuators,
        &extended_layout::AIR_INLET_THROTTLE,
        percent(cmd.air_inlet_throttle_target),
    );
    encode_field(
        &mut actuators,
        &extended_layout::AIR_OUTLET_THROTTLE,
        percent(cmd.air_outlet_throttle_target),
    );
    encode_field(&mut actuators, &extended_layout::COMPRESSOR_SPEED, cmd.compressor_target_speed);
    encode_field(&mut actuators, &extended_layout::COOLANT_PUMP, percent(cmd.coolant_pump_target));

    let mut converter = [0u8; MAX_PAYLOAD_LEN];
    encode_field(&mut converter, &extended_layout::TARGET_VOLTAGE, cmd.dcf_target_voltage);
    encode_field(&mut converter, &extended_layout::TARGET_CURRENT, cmd.dcf_target_current);
    encode_field(&mut converter, &extended_layout::POWER_LIMIT, cmd.power_limit);

    [
        CanFrame::from_payload(SYSTEM_COMMAND_ID, system),
        CanFrame::from_payload(ACTUATOR_SETPOINT_ID, actuators),
        CanFrame::from_payload(CONVERTER_SETPOINT_ID, converter),
    ]
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auto_start_extended() {
        let cmd = ControlCommand::from_json(json!({"mode": "AUTO", "command": "START"})).unwrap();
        let frames = encode_command(&cmd, ProtocolVersion::Extended);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].id, SYSTEM_COMMAND_ID);
        assert_eq!(frames[0].data[0], 0x01 | (1 << 2));
        assert_eq!(frames[0].data[1], 0);
        assert_eq!(frames[1].id, ACTUATOR_SETPOINT_ID);
        assert_eq!(frames[2].id, CONVERTER_SETPOINT_ID);
    }

    #[test]
    fn test_command_codes_adjacent() {
        let byte = |command| {
            let cmd = ControlCommand {
                command,
                ..Default::default()
            };
            encode_extended(&cmd)[0].data[0]
        };
        assert_eq!(byte(Command::None), 0b0000_0000);
        assert_eq!(byte(Command::Stop), 0b0000_1000);
        assert_eq!(byte(Command::Reset), 0b0000_1100);
        assert_eq!(byte(Command::EmergencyStop), 0b0001_0000);
    }

    #[test]
    fn test_overrides_only_in_manual() {
        let mut cmd = ControlCommand {
            force_heater: true,
            force_fan2: true,
            ..Default::default()
        };
        assert_eq!(cmd.override_byte(), 0b0001_0100);

        cmd.mode = OperatingMode::Auto;
        assert_eq!(cmd.override_byte(), 0);
        assert_eq!(encode_extended(&cmd)[0].data[1], 0);
    }

    #[test]
    fn test_setpoints_clamped() {
        let cmd = ControlCommand {
            fan1_target_speed: 250.0,
            fan2_target_speed: -5.0,
            thermostat_target: f64::NAN,
            compressor_target_speed: 30_000.0,
            coolant_pump_target: 101.0,
            dcf_target_voltage: 48.5,
            dcf_target_current: -3.0,
            power_limit: 12.3,
            ..Default::default()
        };
        let [_, actuators, converter] = encode_extended(&cmd);

        assert_eq!(actuators.data[0], 100);
        assert_eq!(actuators.data[1], 0);
        assert_eq!(actuators.data[2], 0);
        assert_eq!(&actuators.data[5..7], &30_000u16.to_be_bytes());
        assert_eq!(actuators.data[7], 100);

        assert_eq!(&converter.data[0..2], &485u16.to_le_bytes());
        assert_eq!(&converter.data[2..4], &[0, 0]);
        assert_eq!(&converter.data[4..6], &123u16.to_le_bytes());
        assert_eq!(&converter.data[6..8], &[0, 0]);
    }

    #[test]
    fn test_legacy_frame_layout() {
        let cmd = ControlCommand {
            mode: OperatingMode::Manual,
            command: Command::Start,
            force_inlet_valve: true,
            force_compressor: true,
            fan1_target_speed: 75.0,
            ..Default::default()
        };
        let frames = encode_command(&cmd, ProtocolVersion::Legacy);
        assert_eq!(frames.len(), 1);

        let frame = &frames[0];
        assert_eq!(frame.id, LEGACY_CONTROL_ID);
        assert_eq!(frame.data.len(), 8);
        assert_eq!(frame.data[0], 1 << 2);
        // Compressor override has no legacy bit
        assert_eq!(frame.data[1], 0x01);
        assert_eq!(frame.data[2], 75);
        assert_eq!(&frame.data[3..5], &240u16.to_le_bytes());
        assert_eq!(&frame.data[5..7], &50u16.to_le_bytes());
        assert_eq!(frame.data[7], 0);
    }

    #[test]
    fn test_json_inputs() {
        let cmd = ControlCommand::from_json(json!({"mode": 1, "command": 9})).unwrap();
        assert_eq!(cmd.mode, OperatingMode::Auto);
        assert_eq!(cmd.command, Command::Code(9));
        assert_eq!(cmd.command.extended_code(), 4);
        assert_eq!(cmd.command.legacy_code(), 1);
        assert_eq!(cmd.fan1_target_speed, 50.0);
        assert_eq!(cmd.dcf_target_voltage, 24.0);

        let cmd = ControlCommand::from_json(json!({"mode": "manual", "command": "estop"})).unwrap();
        assert_eq!(cmd.mode, OperatingMode::Manual);
        assert_eq!(cmd.command, Command::EmergencyStop);

        let cmd = ControlCommand::from_json(json!({"mode": "bogus", "command": -3})).unwrap();
        assert_eq!(cmd.mode, OperatingMode::Manual);
        assert_eq!(cmd.command.extended_code(), 0);
        assert_eq!(cmd.command.legacy_code(), 0b101);

        assert!(ControlCommand::from_json(json!({"fan1TargetSpeed": "fast"})).is_err());
    }

    #[test]
    fn test_serialize_names() {
        let value = serde_json::to_value(ControlCommand {
            mode: OperatingMode::Auto,
            command: Command::EmergencyStop,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["mode"], "AUTO");
        assert_eq!(value["command"], "EMERGENCY_STOP");
        assert_eq!(value["dcfTargetCurrent"], 5.0);

        let value = serde_json::to_value(ControlCommand {
            command: Command::Code(3),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["command"], 3);
    }
}
