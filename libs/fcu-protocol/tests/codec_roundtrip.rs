//! Field round-trip through the published layouts
//!
//! Each physical value is packed with the same `FieldSpec` the decoder uses,
//! dispatched as a frame, and read back from the machine state. Recovery must
//! be within one quantization step.

// Allow unwrap() in tests for cleaner test code
#![allow(clippy::disallowed_methods)]

use fcu_protocol::bytes::{decode_field, encode_field, FieldSpec};
use fcu_protocol::command::{encode_extended, encode_legacy, extended_layout, legacy_layout};
use fcu_protocol::decoders::{extended, legacy};
use fcu_protocol::{CanFrame, ControlCommand, MachineState, ProtocolTable, ProtocolVersion};

type Getter = fn(&MachineState) -> f64;

struct Case {
    id: u32,
    spec: FieldSpec,
    value: f64,
    get: Getter,
}

fn case(id: u32, spec: FieldSpec, value: f64, get: Getter) -> Case {
    Case {
        id,
        spec,
        value,
        get,
    }
}

fn run(version: ProtocolVersion, cases: &[Case]) {
    let table = ProtocolTable::new(version);
    for case in cases {
        let mut payload = [0u8; 8];
        encode_field(&mut payload, &case.spec, case.value);

        let mut state = MachineState::new();
        let frame = CanFrame::new(case.id, payload.to_vec()).unwrap();
        assert!(table.dispatch(&mut state, &frame, 0).is_decoded());

        let back = (case.get)(&state);
        assert!(
            (back - case.value).abs() <= case.spec.scale.abs() / 2.0 + 1e-9,
            "0x{:08X} {:?}: {} -> {}",
            case.id,
            case.spec,
            case.value,
            back
        );
    }
}

// ============================================================================
// Telemetry tables
// ============================================================================

#[test]
fn test_legacy_round_trip() {
    run(
        ProtocolVersion::Legacy,
        &[
            case(legacy::POWER_ID, legacy::STACK_VOLTAGE, 187.43, |s| s.power.stack_voltage()),
            case(legacy::POWER_ID, legacy::STACK_CURRENT, 321.7, |s| s.power.stack_current()),
            case(legacy::POWER_ID, legacy::DCDC_OUT_VOLTAGE, 24.08, |s| {
                s.power.dcdc_out_voltage()
            }),
            case(legacy::POWER_ID, legacy::DCDC_OUT_CURRENT, 99.9, |s| {
                s.power.dcdc_out_current()
            }),
            case(legacy::SENSORS_ID, legacy::STACK_TEMP, 63.4, |s| s.water.outlet_temp),
            case(legacy::SENSORS_ID, legacy::AMBIENT_TEMP, -12.5, |s| s.air.inlet_temp),
            case(legacy::SENSORS_ID, legacy::H2_CYLINDER_PRESSURE, 35_000.0, |s| {
                s.h2.high_pressure
            }),
            case(legacy::SENSORS_ID, legacy::H2_INLET_PRESSURE, 850.0, |s| s.h2.inlet_pressure),
            case(legacy::SENSORS_ID, legacy::H2_CONCENTRATION, 2.5, |s| s.h2.concentration),
            case(legacy::IO_ID, legacy::DCDC_MOS_TEMP, 71.2, |s| s.temps.dcdc_temp),
            case(legacy::IO_ID, legacy::FAN1_DUTY, 64.0, |s| f64::from(s.io.main_fan_duty)),
            case(legacy::IO_ID, legacy::FAULT_CODE, 4097.0, |s| f64::from(s.io.fault_code)),
        ],
    );
}

#[test]
fn test_extended_round_trip() {
    use extended::*;
    run(
        ProtocolVersion::Extended,
        &[
            case(STACK_STATUS_ID, STACK_VOLTAGE, 312.0, |s| s.power.stack_voltage()),
            case(STACK_STATUS_ID, STACK_CURRENT, 410.0, |s| s.power.stack_current()),
            case(STACK_STATUS_ID, PUMP_SPEED, 72.0, |s| s.water.main_pump_speed),
            case(DCDC_ID, DCDC_OUT_VOLTAGE, 620.4, |s| s.power.dcdc_out_voltage()),
            case(DCDC_ID, DCDC_OUT_CURRENT, 180.3, |s| s.power.dcdc_out_current()),
            case(DCDC_ID, DCDC_IN_VOLTAGE, 300.1, |s| s.power.dcdc_in_voltage()),
            case(DCDC_ID, DCDC_IN_CURRENT, 401.9, |s| s.power.dcdc_in_current()),
            case(H2_PRESSURE_ID, H2_HIGH_PRESSURE, 35_000.0, |s| s.h2.high_pressure),
            case(H2_PRESSURE_ID, H2_INLET_PRESSURE, 180.5, |s| s.h2.inlet_pressure),
            case(H2_PRESSURE_ID, H2_OUTLET_PRESSURE, 140.2, |s| s.h2.outlet_pressure),
            case(H2_PRESSURE_ID, H2_INLET_FLOW, 95.6, |s| s.h2.inlet_flow),
            case(H2_LOOP_ID, H2_CIRCULATION_SPEED, 4200.0, |s| s.h2.circulation_speed),
            case(H2_LOOP_ID, H2_INLET_TEMP, -5.0, |s| s.h2.inlet_temp),
            case(H2_LOOP_ID, H2_SEPARATOR_PRESSURE, 160.0, |s| s.h2.separator_pressure),
            case(H2_LOOP_ID, H2_CONCENTRATION, 47.5, |s| s.h2.concentration),
            case(H2_LOOP_ID, CONDUCTIVITY, 2.3, |s| s.power.conductivity()),
            case(H2_LOOP_ID, DCDC_TEMP, 58.0, |s| s.temps.dcdc_temp),
            case(AIR_ID, AIR_INLET_PRESSURE, 210.0, |s| s.air.inlet_pressure),
            case(AIR_ID, AIR_OUTLET_PRESSURE, 190.0, |s| s.air.outlet_pressure),
            case(AIR_ID, AIR_INLET_TEMP, 35.0, |s| s.air.inlet_temp),
            case(AIR_ID, AIR_OUTLET_TEMP, 72.0, |s| s.air.outlet_temp),
            case(AIR_ID, AIR_INLET_FLOW, 410.7, |s| s.air.inlet_flow),
            case(AIR_ID, AIR_HUMIDITY, 88.5, |s| s.air.humidity),
            case(AIR_ID, WATER_INLET_PRESSURE, 150.0, |s| s.water.inlet_pressure),
            case(COMPRESSOR_ID, COMPRESSOR_SET_SPEED, 65_000.0, |s| {
                s.air.compressor_set_speed
            }),
            case(COMPRESSOR_ID, COMPRESSOR_REAL_SPEED, 61_250.0, |s| {
                s.air.compressor_real_speed
            }),
            case(COMPRESSOR_ID, WATER_INLET_TEMP, 62.0, |s| s.water.inlet_temp),
            case(COMPRESSOR_ID, WATER_OUTLET_TEMP, 71.0, |s| s.water.outlet_temp),
            case(COMPRESSOR_ID, WATER_AUX_OUTLET_TEMP, 45.0, |s| s.water.aux_outlet_temp),
            case(COMPRESSOR_ID, WATER_AUX_COMP_TEMP, 52.0, |s| s.water.aux_comp_temp),
        ],
    );
}

// ============================================================================
// Control frames
// ============================================================================

fn read(frame: &CanFrame, spec: &FieldSpec) -> f64 {
    decode_field(&frame.data, spec).unwrap()
}

#[test]
fn test_control_setpoints_recoverable() {
    let cmd = ControlCommand {
        fan1_target_speed: 63.0,
        fan2_target_speed: 12.0,
        thermostat_target: 40.0,
        air_inlet_throttle_target: 55.0,
        air_outlet_throttle_target: 45.0,
        compressor_target_speed: 52_000.0,
        coolant_pump_target: 80.0,
        dcf_target_voltage: 27.6,
        dcf_target_current: 12.4,
        power_limit: 60.5,
        ..Default::default()
    };

    let [_, actuators, converter] = encode_extended(&cmd);
    assert_eq!(read(&actuators, &extended_layout::FAN1_TARGET), 63.0);
    assert_eq!(read(&actuators, &extended_layout::FAN2_TARGET), 12.0);
    assert_eq!(read(&actuators, &extended_layout::THERMOSTAT_TARGET), 40.0);
    assert_eq!(read(&actuators, &extended_layout::AIR_INLET_THROTTLE), 55.0);
    assert_eq!(read(&actuators, &extended_layout::AIR_OUTLET_THROTTLE), 45.0);
    assert_eq!(read(&actuators, &extended_layout::COMPRESSOR_SPEED), 52_000.0);
    assert_eq!(read(&actuators, &extended_layout::COOLANT_PUMP), 80.0);
    assert!((read(&converter, &extended_layout::TARGET_VOLTAGE) - 27.6).abs() < 0.051);
    assert!((read(&converter, &extended_layout::TARGET_CURRENT) - 12.4).abs() < 0.051);
    assert!((read(&converter, &extended_layout::POWER_LIMIT) - 60.5).abs() < 0.051);

    let legacy = encode_legacy(&cmd);
    assert_eq!(read(&legacy, &legacy_layout::FAN1_TARGET), 63.0);
    assert!((read(&legacy, &legacy_layout::TARGET_VOLTAGE) - 27.6).abs() < 0.051);
    assert!((read(&legacy, &legacy_layout::TARGET_CURRENT) - 12.4).abs() < 0.051);
}
