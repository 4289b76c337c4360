//! Snapshot export
//!
//! The exported shape is versioned separately from [`MachineState`]. All
//! field renaming for external consumers happens here: the internal model
//! keeps wire names (`dcdc_out_voltage`, `water.outlet_temp`), clients see
//! the compatibility names (`dcfOutVoltage`, `sensors.stackTemp`).
//! Derived power and efficiency are recomputed from their inputs at export.

use crate::error::Result;
use crate::registry::ProtocolVersion;
use crate::state::{efficiency_percent, MachineState};
use serde::{Deserialize, Serialize};

/// Bumped whenever a field is renamed or removed
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 2;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub heartbeat: u8,
    pub state: u8,
    pub fault_level: u8,
    pub dcdc_state: u8,
    pub dcdc_fault_code: u8,
}

/// V, A, kW, %
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerSnapshot {
    pub stack_voltage: f64,
    pub stack_current: f64,
    pub stack_power: f64,
    pub dcf_out_voltage: f64,
    pub dcf_out_current: f64,
    pub dcf_in_voltage: f64,
    pub dcf_in_current: f64,
    pub dcf_power: f64,
    pub dcf_efficiency: f64,
    pub conductivity: f64,
}

/// Compatibility sensor view; pressures in MPa
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorsSnapshot {
    pub stack_temp: f64,
    pub ambient_temp: f64,
    pub h2_cylinder_pressure: f64,
    pub h2_inlet_pressure: f64,
    pub h2_concentration: f64,
}

/// Compatibility actuator view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IoSnapshot {
    pub h2_inlet_valve: bool,
    pub h2_purge_valve: bool,
    pub proportional_valve: bool,
    pub heater: bool,
    pub fan1: bool,
    pub fan2: bool,
    pub fan1_duty: u8,
    pub dcf_mos_temp: f64,
    pub fault_code: u16,
}

/// Pressures in kPa
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct H2Snapshot {
    pub high_pressure: f64,
    pub inlet_pressure: f64,
    pub outlet_pressure: f64,
    pub inlet_flow: f64,
    pub inlet_temp: f64,
    pub circulation_speed: f64,
    pub separator_pressure: f64,
    pub concentration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirSnapshot {
    pub inlet_pressure: f64,
    pub inlet_temp: f64,
    pub outlet_pressure: f64,
    pub outlet_temp: f64,
    pub inlet_flow: f64,
    pub humidity: f64,
    pub compressor_set_speed: f64,
    pub compressor_real_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterSnapshot {
    pub inlet_pressure: f64,
    pub inlet_temp: f64,
    pub outlet_temp: f64,
    pub aux_outlet_temp: f64,
    pub aux_comp_temp: f64,
    pub pump_speed: f64,
}

/// Actuators without a compatibility alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorSnapshot {
    pub h2_heat_valve: bool,
    pub h2_injectors: [bool; 4],
    pub h2_circ_pump: bool,
    pub air_inlet_throttle: bool,
    pub air_outlet_throttle: bool,
    pub compressor: bool,
    pub bypass_valve: bool,
    pub main_pump: bool,
    pub thermostat_state: u8,
    pub water_level_low: bool,
    pub aux_pump: bool,
    pub thermostat_position: u8,
    pub air_inlet_throttle_pos: u8,
    pub air_outlet_throttle_pos: u8,
    pub h2_purge_countdown: u8,
}

/// Immutable, derived-field-refreshed copy of the machine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSnapshot {
    pub schema_version: u32,
    pub protocol: ProtocolVersion,
    pub connected: bool,
    pub last_update: i64,
    pub status: StatusSnapshot,
    pub power: PowerSnapshot,
    pub sensors: SensorsSnapshot,
    pub io: IoSnapshot,
    pub h2: H2Snapshot,
    pub air: AirSnapshot,
    pub water: WaterSnapshot,
    pub actuators: ActuatorSnapshot,
    pub faults: [u8; 8],
}

impl MachineSnapshot {
    /// Export a state copy under the given table's label
    pub fn export(state: &MachineState, protocol: ProtocolVersion) -> Self {
        let power = &state.power;
        let (h2, air, water, io) = (&state.h2, &state.air, &state.water, &state.io);

        let stack_power = power.stack_voltage() * power.stack_current() / 1000.0;
        let dcf_power = power.dcdc_out_voltage() * power.dcdc_out_current() / 1000.0;
        let efficiency = efficiency_percent(dcf_power, stack_power);

        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            protocol,
            connected: state.connected,
            last_update: state.last_update,
            status: StatusSnapshot {
                heartbeat: state.status.heartbeat,
                state: state.status.state,
                fault_level: state.status.fault_level,
                dcdc_state: state.status.dcdc_state,
                dcdc_fault_code: state.status.dcdc_fault_code,
            },
            power: PowerSnapshot {
                stack_voltage: round_to(power.stack_voltage(), 2),
                stack_current: round_to(power.stack_current(), 1),
                stack_power: round_to(stack_power, 2),
                dcf_out_voltage: round_to(power.dcdc_out_voltage(), 2),
                dcf_out_current: round_to(power.dcdc_out_current(), 1),
                dcf_in_voltage: round_to(power.dcdc_in_voltage(), 2),
                dcf_in_current: round_to(power.dcdc_in_current(), 1),
                dcf_power: round_to(dcf_power, 2),
                dcf_efficiency: round_to(efficiency, 1),
                conductivity: round_to(power.conductivity(), 1),
            },
            sensors: SensorsSnapshot {
                stack_temp: round_to(water.outlet_temp, 1),
                ambient_temp: round_to(air.inlet_temp, 1),
                h2_cylinder_pressure: round_to(h2.high_pressure / 1000.0, 2),
                h2_inlet_pressure: round_to(h2.inlet_pressure / 1000.0, 2),
                h2_concentration: round_to(h2.concentration, 1),
            },
            io: IoSnapshot {
                h2_inlet_valve: io.h2_high_valve,
                h2_purge_valve: io.h2_purge_valve,
                proportional_valve: io.proportional_valve,
                heater: io.ptc_heater,
                fan1: io.main_fan,
                fan2: io.aux_fan,
                fan1_duty: io.main_fan_duty,
                dcf_mos_temp: round_to(state.temps.dcdc_temp, 1),
                fault_code: io.fault_code,
            },
            h2: H2Snapshot {
                high_pressure: round_to(h2.high_pressure, 1),
                inlet_pressure: round_to(h2.inlet_pressure, 1),
                outlet_pressure: round_to(h2.outlet_pressure, 1),
                inlet_flow: round_to(h2.inlet_flow, 1),
                inlet_temp: round_to(h2.inlet_temp, 1),
                circulation_speed: h2.circulation_speed.round(),
                separator_pressure: round_to(h2.separator_pressure, 1),
                concentration: round_to(h2.concentration, 1),
            },
            air: AirSnapshot {
                inlet_pressure: round_to(air.inlet_pressure, 1),
                inlet_temp: round_to(air.inlet_temp, 1),
                outlet_pressure: round_to(air.outlet_pressure, 1),
                outlet_temp: round_to(air.outlet_temp, 1),
                inlet_flow: round_to(air.inlet_flow, 1),
                humidity: round_to(air.humidity, 1),
                compressor_set_speed: air.compressor_set_speed.round(),
                compressor_real_speed: air.compressor_real_speed.round(),
            },
            water: WaterSnapshot {
                inlet_pressure: round_to(water.inlet_pressure, 1),
                inlet_temp: round_to(water.inlet_temp, 1),
                outlet_temp: round_to(water.outlet_temp, 1),
                aux_outlet_temp: round_to(water.aux_outlet_temp, 1),
                aux_comp_temp: round_to(water.aux_comp_temp, 1),
                pump_speed: round_to(water.main_pump_speed, 1),
            },
            actuators: ActuatorSnapshot {
                h2_heat_valve: io.h2_heat_valve,
                h2_injectors: io.h2_injectors,
                h2_circ_pump: io.h2_circ_pump,
                air_inlet_throttle: io.air_inlet_throttle,
                air_outlet_throttle: io.air_outlet_throttle,
                compressor: io.compressor,
                bypass_valve: io.bypass_valve,
                main_pump: io.main_pump,
                thermostat_state: io.thermostat_state,
                water_level_low: io.water_level_low,
                aux_pump: io.aux_pump,
                thermostat_position: io.thermostat_position,
                air_inlet_throttle_pos: io.air_inlet_throttle_pos,
                air_outlet_throttle_pos: io.air_outlet_throttle_pos,
                h2_purge_countdown: io.h2_purge_countdown,
            },
            faults: io.faults,
        }
    }

    /// Nested field mapping for network delivery
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Input row for the fault classifier
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            stack_temp: self.sensors.stack_temp,
            stack_voltage: self.power.stack_voltage,
            ambient_temp: self.sensors.ambient_temp,
            h2_concentration: self.sensors.h2_concentration,
            stack_power: self.power.stack_power,
            stack_current: self.power.stack_current,
            h2_inlet_pressure: self.sensors.h2_inlet_pressure,
        }
    }
}

/// Classifier features, serialized under the model's column names
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "T_Stack_inlet")]
    pub stack_temp: f64,
    #[serde(rename = "U_totV")]
    pub stack_voltage: f64,
    #[serde(rename = "T_3")]
    pub ambient_temp: f64,
    #[serde(rename = "RH_H2")]
    pub h2_concentration: f64,
    #[serde(rename = "PW")]
    pub stack_power: f64,
    #[serde(rename = "i_write")]
    pub stack_current: f64,
    #[serde(rename = "P_Air_inlet")]
    pub h2_inlet_pressure: f64,
}

impl FeatureVector {
    /// Column order expected by the classifier
    pub const NAMES: [&'static str; 7] = [
        "T_Stack_inlet",
        "U_totV",
        "T_3",
        "RH_H2",
        "PW",
        "i_write",
        "P_Air_inlet",
    ];

    pub fn to_array(&self) -> [f64; 7] {
        [
            self.stack_temp,
            self.stack_voltage,
            self.ambient_temp,
            self.h2_concentration,
            self.stack_power,
            self.stack_current,
            self.h2_inlet_pressure,
        ]
    }
}
