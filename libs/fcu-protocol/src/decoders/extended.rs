//! Extended 8-message telemetry table
//!
//! Stack status and DC/DC electrical frames use little-endian words; the
//! hydrogen, air and compressor frames use big-endian words. The split
//! mirrors the controller firmware and must not be normalized.
//! Every frame is 8 bytes.

use super::{field, require};
use crate::bytes::{extract_bit_u8, extract_field_u8, FieldSpec};
use crate::state::MachineState;

pub const STACK_STATUS_ID: u32 = 0x1824A7A4;
pub const DCDC_ID: u32 = 0x1825A7A4;
pub const H2_PRESSURE_ID: u32 = 0x1826A7A4;
pub const H2_LOOP_ID: u32 = 0x1827A7A4;
pub const AIR_ID: u32 = 0x1828A7A4;
pub const COMPRESSOR_ID: u32 = 0x1829A7A4;
pub const ACTUATOR_ID: u32 = 0x182AA7A4;
pub const FAULT_ID: u32 = 0x182BA7A4;

pub const FRAME_LEN: usize = 8;

/// Run-state codes carried in bits[7:2] of the stack status frame
pub mod run_state {
    pub const SHUTDOWN_COMPLETE: u8 = 0x00;
    pub const SHUTTING_DOWN: u8 = 0x01;
    pub const RUNNING: u8 = 0x02;
    pub const EMERGENCY_STOP: u8 = 0x03;
    pub const FAULT: u8 = 0x0F;
    pub const RESET: u8 = 0x10;
    pub const STARTING: u8 = 0x11;
}

// Stack status (LE)
pub const HEARTBEAT: FieldSpec = FieldSpec::u8(0);
pub const STACK_VOLTAGE: FieldSpec = FieldSpec::u16_le(2);
pub const STACK_CURRENT: FieldSpec = FieldSpec::u16_le(4);
pub const PUMP_SPEED: FieldSpec = FieldSpec::u8(6);

// DC/DC electrical (LE)
pub const DCDC_OUT_VOLTAGE: FieldSpec = FieldSpec::u16_le(0).scaled(0.1, 0.0);
pub const DCDC_OUT_CURRENT: FieldSpec = FieldSpec::u16_le(2).scaled(0.1, 0.0);
pub const DCDC_IN_VOLTAGE: FieldSpec = FieldSpec::u16_le(4).scaled(0.1, 0.0);
pub const DCDC_IN_CURRENT: FieldSpec = FieldSpec::u16_le(6).scaled(0.1, 0.0);

// Hydrogen pressure (BE)
pub const H2_HIGH_PRESSURE: FieldSpec = FieldSpec::u16_be(0);
pub const H2_INLET_PRESSURE: FieldSpec = FieldSpec::u16_be(2).scaled(0.1, 0.0);
pub const H2_OUTLET_PRESSURE: FieldSpec = FieldSpec::u16_be(4).scaled(0.1, 0.0);
pub const H2_INLET_FLOW: FieldSpec = FieldSpec::u16_be(6).scaled(0.1, 0.0);

// Hydrogen loop (BE)
pub const H2_CIRCULATION_SPEED: FieldSpec = FieldSpec::u16_be(0);
pub const H2_INLET_TEMP: FieldSpec = FieldSpec::u8(2).scaled(1.0, -40.0);
pub const H2_SEPARATOR_PRESSURE: FieldSpec = FieldSpec::u8(3);
pub const H2_CONCENTRATION: FieldSpec = FieldSpec::u8(4).scaled(0.5, 0.0);
pub const DCDC_FAULT_CODE: FieldSpec = FieldSpec::u8(5);
pub const CONDUCTIVITY: FieldSpec = FieldSpec::u8(6).scaled(0.1, 0.0);
pub const DCDC_TEMP: FieldSpec = FieldSpec::u8(7).scaled(1.0, -40.0);

// Air path (BE)
pub const AIR_INLET_PRESSURE: FieldSpec = FieldSpec::u8(0);
pub const AIR_OUTLET_PRESSURE: FieldSpec = FieldSpec::u8(1);
pub const AIR_INLET_TEMP: FieldSpec = FieldSpec::u8(2).scaled(1.0, -40.0);
pub const AIR_OUTLET_TEMP: FieldSpec = FieldSpec::u8(3).scaled(1.0, -40.0);
pub const AIR_INLET_FLOW: FieldSpec = FieldSpec::u16_be(4).scaled(0.1, 0.0);
pub const AIR_HUMIDITY: FieldSpec = FieldSpec::u8(6).scaled(0.5, 0.0);
pub const WATER_INLET_PRESSURE: FieldSpec = FieldSpec::u8(7);

// Compressor and coolant (BE)
pub const COMPRESSOR_SET_SPEED: FieldSpec = FieldSpec::u16_be(0);
pub const COMPRESSOR_REAL_SPEED: FieldSpec = FieldSpec::u16_be(2);
pub const WATER_INLET_TEMP: FieldSpec = FieldSpec::u8(4).scaled(1.0, -40.0);
pub const WATER_OUTLET_TEMP: FieldSpec = FieldSpec::u8(5).scaled(1.0, -40.0);
pub const WATER_AUX_OUTLET_TEMP: FieldSpec = FieldSpec::u8(6).scaled(1.0, -40.0);
pub const WATER_AUX_COMP_TEMP: FieldSpec = FieldSpec::u8(7).scaled(1.0, -40.0);

/// b0 heartbeat, b1 bits[1:0] fault level / bits[7:2] run state,
/// b2-3 stack V, b4-5 stack I, b6 coolant pump %, b7 bits[1:0] DC/DC state
pub fn decode_stack_status(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, FRAME_LEN)?;
    let heartbeat = field(data, &HEARTBEAT)? as u8;
    let fault_level = extract_field_u8(data[1], 0, 2);
    let run_state = extract_field_u8(data[1], 2, 6);
    let voltage = field(data, &STACK_VOLTAGE)?;
    let current = field(data, &STACK_CURRENT)?;
    let pump_speed = field(data, &PUMP_SPEED)?;
    let dcdc_state = extract_field_u8(data[7], 0, 2);

    state.status.heartbeat = heartbeat;
    state.status.fault_level = fault_level;
    state.status.state = run_state;
    state.status.dcdc_state = dcdc_state;
    state.power.set_stack(voltage, current);
    state.water.main_pump_speed = pump_speed;
    Some(())
}

pub fn decode_dcdc(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, FRAME_LEN)?;
    let out_v = field(data, &DCDC_OUT_VOLTAGE)?;
    let out_i = field(data, &DCDC_OUT_CURRENT)?;
    let in_v = field(data, &DCDC_IN_VOLTAGE)?;
    let in_i = field(data, &DCDC_IN_CURRENT)?;

    state.power.set_dcdc_output(out_v, out_i);
    state.power.set_dcdc_input(in_v, in_i);
    Some(())
}

pub fn decode_h2_pressure(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, FRAME_LEN)?;
    let high = field(data, &H2_HIGH_PRESSURE)?;
    let inlet = field(data, &H2_INLET_PRESSURE)?;
    let outlet = field(data, &H2_OUTLET_PRESSURE)?;
    let flow = field(data, &H2_INLET_FLOW)?;

    state.h2.high_pressure = high;
    state.h2.inlet_pressure = inlet;
    state.h2.outlet_pressure = outlet;
    state.h2.inlet_flow = flow;
    Some(())
}

pub fn decode_h2_loop(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, FRAME_LEN)?;
    let circulation = field(data, &H2_CIRCULATION_SPEED)?;
    let inlet_temp = field(data, &H2_INLET_TEMP)?;
    let separator = field(data, &H2_SEPARATOR_PRESSURE)?;
    let concentration = field(data, &H2_CONCENTRATION)?;
    let dcdc_fault = field(data, &DCDC_FAULT_CODE)? as u8;
    let conductivity = field(data, &CONDUCTIVITY)?;
    let dcdc_temp = field(data, &DCDC_TEMP)?;

    state.h2.circulation_speed = circulation;
    state.h2.inlet_temp = inlet_temp;
    state.h2.separator_pressure = separator;
    state.h2.concentration = concentration;
    state.status.dcdc_fault_code = dcdc_fault;
    state.power.set_conductivity(conductivity);
    state.temps.dcdc_temp = dcdc_temp;
    Some(())
}

pub fn decode_air(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, FRAME_LEN)?;
    let inlet_pressure = field(data, &AIR_INLET_PRESSURE)?;
    let outlet_pressure = field(data, &AIR_OUTLET_PRESSURE)?;
    let inlet_temp = field(data, &AIR_INLET_TEMP)?;
    let outlet_temp = field(data, &AIR_OUTLET_TEMP)?;
    let flow = field(data, &AIR_INLET_FLOW)?;
    let humidity = field(data, &AIR_HUMIDITY)?;
    let water_pressure = field(data, &WATER_INLET_PRESSURE)?;

    state.air.inlet_pressure = inlet_pressure;
    state.air.outlet_pressure = outlet_pressure;
    state.air.inlet_temp = inlet_temp;
    state.air.outlet_temp = outlet_temp;
    state.air.inlet_flow = flow;
    state.air.humidity = humidity;
    state.water.inlet_pressure = water_pressure;
    Some(())
}

pub fn decode_compressor(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, FRAME_LEN)?;
    let set_speed = field(data, &COMPRESSOR_SET_SPEED)?;
    let real_speed = field(data, &COMPRESSOR_REAL_SPEED)?;
    let inlet_temp = field(data, &WATER_INLET_TEMP)?;
    let outlet_temp = field(data, &WATER_OUTLET_TEMP)?;
    let aux_outlet = field(data, &WATER_AUX_OUTLET_TEMP)?;
    let aux_comp = field(data, &WATER_AUX_COMP_TEMP)?;

    state.air.compressor_set_speed = set_speed;
    state.air.compressor_real_speed = real_speed;
    state.water.inlet_temp = inlet_temp;
    state.water.outlet_temp = outlet_temp;
    state.water.aux_outlet_temp = aux_outlet;
    state.water.aux_comp_temp = aux_comp;
    Some(())
}

/// Three flag bytes followed by positions, purge countdown and fan duty
///
/// The coolant level bit reports "level OK", so it is inverted into
/// `water_level_low`.
pub fn decode_actuators(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, FRAME_LEN)?;
    let (h2, air, aux) = (data[0], data[1], data[2]);

    let io = &mut state.io;
    io.h2_high_valve = extract_bit_u8(h2, 0);
    io.h2_heat_valve = extract_bit_u8(h2, 1);
    io.h2_purge_valve = extract_bit_u8(h2, 2);
    io.h2_circ_pump = extract_bit_u8(h2, 3);
    for (i, injector) in io.h2_injectors.iter_mut().enumerate() {
        *injector = extract_bit_u8(h2, 4 + i as u8);
    }

    io.air_inlet_throttle = extract_bit_u8(air, 0);
    io.air_outlet_throttle = extract_bit_u8(air, 1);
    io.compressor = extract_bit_u8(air, 2);
    io.bypass_valve = extract_bit_u8(air, 3);
    io.main_pump = extract_bit_u8(air, 4);
    io.main_fan = extract_bit_u8(air, 5);
    io.thermostat_state = extract_field_u8(air, 6, 2);

    io.water_level_low = !extract_bit_u8(aux, 0);
    io.aux_fan = extract_bit_u8(aux, 1);
    io.aux_pump = extract_bit_u8(aux, 2);
    io.ptc_heater = extract_bit_u8(aux, 3);

    io.thermostat_position = data[3];
    io.air_inlet_throttle_pos = data[4];
    io.air_outlet_throttle_pos = data[5];
    io.h2_purge_countdown = data[6];
    io.main_fan_duty = data[7];
    Some(())
}

pub fn decode_faults(data: &[u8], state: &mut MachineState) -> Option<()> {
    require(data, FRAME_LEN)?;
    let mut faults = [0u8; 8];
    faults.copy_from_slice(&data[..FRAME_LEN]);

    state.io.faults = faults;
    state.io.fault_code = u16::from(faults[0]);
    Some(())
}
