//! Legacy 4-message telemetry table
//!
//! All multi-byte words are little-endian. Pressures arrive in 0.01 MPa steps
//! and are stored as kPa.

use super::{field, require};
use crate::bytes::{extract_bit_u8, extract_field_u8, FieldSpec};
use crate::state::MachineState;

pub const STATUS_ID: u32 = 0x18FF01F0;
pub const POWER_ID: u32 = 0x18FF02F0;
pub const SENSORS_ID: u32 = 0x18FF03F0;
pub const IO_ID: u32 = 0x18FF04F0;

pub const STATUS_LEN: usize = 2;
pub const POWER_LEN: usize = 8;
pub const SENSORS_LEN: usize = 8;
pub const IO_LEN: usize = 6;

// Power (0x18FF02F0)
pub const STACK_VOLTAGE: FieldSpec = FieldSpec::u16_le(0).scaled(0.01, 0.0);
pub const STACK_CURRENT: FieldSpec = FieldSpec::u16_le(2).scaled(0.1, 0.0);
pub const DCDC_OUT_VOLTAGE: FieldSpec = FieldSpec::u16_le(4).scaled(0.01, 0.0);
pub const DCDC_OUT_CURRENT: FieldSpec = FieldSpec::u16_le(6).scaled(0.1, 0.0);

// Sensors (0x18FF03F0)
pub const STACK_TEMP: FieldSpec = FieldSpec::i16_le(0).scaled(0.1, -40.0);
pub const AMBIENT_TEMP: FieldSpec = FieldSpec::i16_le(2).scaled(0.1, -40.0);
/// 0.01 MPa per bit = 10 kPa
pub const H2_CYLINDER_PRESSURE: FieldSpec = FieldSpec::u16_le(4).scaled(10.0, 0.0);
pub const H2_INLET_PRESSURE: FieldSpec = FieldSpec::u8(6).scaled(10.0, 0.0);
pub const H2_CONCENTRATION: FieldSpec = FieldSpec::u8(7).scaled(0.5, 0.0);

// IO (0x18FF04F0)
pub const FAN1_DUTY: FieldSpec = FieldSpec::u8(1);
pub const DCDC_MOS_TEMP: FieldSpec = FieldSpec::i16_le(2).scaled(0.1, -40.0);
pub const FAULT_CODE: FieldSpec = FieldSpec::u16_le(4);

/// b0 heartbeat, b1 bits[1:0] run state, bits[3:2] fault level
pub fn decode_status(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, STATUS_LEN)?;
    let heartbeat = data[0];
    let run_state = extract_field_u8(data[1], 0, 2);
    let fault_level = extract_field_u8(data[1], 2, 2);

    state.status.heartbeat = heartbeat;
    state.status.state = run_state;
    state.status.fault_level = fault_level;
    Some(())
}

pub fn decode_power(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, POWER_LEN)?;
    let stack_v = field(data, &STACK_VOLTAGE)?;
    let stack_i = field(data, &STACK_CURRENT)?;
    let out_v = field(data, &DCDC_OUT_VOLTAGE)?;
    let out_i = field(data, &DCDC_OUT_CURRENT)?;

    state.power.set_stack(stack_v, stack_i);
    state.power.set_dcdc_output(out_v, out_i);
    Some(())
}

pub fn decode_sensors(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, SENSORS_LEN)?;
    let stack_temp = field(data, &STACK_TEMP)?;
    let ambient_temp = field(data, &AMBIENT_TEMP)?;
    let cylinder = field(data, &H2_CYLINDER_PRESSURE)?;
    let inlet = field(data, &H2_INLET_PRESSURE)?;
    let concentration = field(data, &H2_CONCENTRATION)?;

    state.water.outlet_temp = stack_temp;
    state.air.inlet_temp = ambient_temp;
    state.h2.high_pressure = cylinder;
    state.h2.inlet_pressure = inlet;
    state.h2.concentration = concentration;
    Some(())
}

/// b0 flags: inlet valve, purge valve, proportional valve, heater, fan1, fan2
pub fn decode_io(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, IO_LEN)?;
    let flags = data[0];
    let fan1_duty = field(data, &FAN1_DUTY)? as u8;
    let mos_temp = field(data, &DCDC_MOS_TEMP)?;
    let fault_code = field(data, &FAULT_CODE)? as u16;

    let io = &mut state.io;
    io.h2_high_valve = extract_bit_u8(flags, 0);
    io.h2_purge_valve = extract_bit_u8(flags, 1);
    io.proportional_valve = extract_bit_u8(flags, 2);
    io.ptc_heater = extract_bit_u8(flags, 3);
    io.main_fan = extract_bit_u8(flags, 4);
    io.aux_fan = extract_bit_u8(flags, 5);
    io.main_fan_duty = fan1_duty;
    io.fault_code = fault_code;
    io.faults[0] = data[4];
    io.faults[1] = data[5];
    state.temps.dcdc_temp = mos_temp;
    Some(())
}
