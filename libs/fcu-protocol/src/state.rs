//! Aggregated machine state
//!
//! One [`MachineState`] exists per controller session. Decoders mutate it in
//! place; every field starts at a defined default so the structure is never
//! partially uninitialized. Values are stored in physical units under the
//! wire names. Export aliases live in [`crate::snapshot`].
//!
//! Derived power and efficiency are owned by [`PowerData`]: its inputs are
//! only reachable through setters that recompute the products.

/// Efficiency above this is treated as a sensor fault and clamped
pub const MAX_EFFICIENCY: f64 = 99.9;

/// Stack efficiency in percent: `output / input * 100`
///
/// Zero when the input power is not positive, clamped at [`MAX_EFFICIENCY`].
pub fn efficiency_percent(output_kw: f64, input_kw: f64) -> f64 {
    if input_kw <= 0.0 || !input_kw.is_finite() {
        return 0.0;
    }
    (output_kw / input_kw * 100.0).clamp(0.0, MAX_EFFICIENCY)
}

/// Controller status fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusData {
    /// Rolling counter, wraps at 256
    pub heartbeat: u8,
    pub state: u8,
    pub fault_level: u8,
    pub dcdc_state: u8,
    pub dcdc_fault_code: u8,
}

/// Stack and DC/DC electrical values
///
/// Voltages in V, currents in A, powers in kW, efficiency in %.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerData {
    stack_voltage: f64,
    stack_current: f64,
    stack_power: f64,
    dcdc_out_voltage: f64,
    dcdc_out_current: f64,
    dcdc_out_power: f64,
    dcdc_in_voltage: f64,
    dcdc_in_current: f64,
    efficiency: f64,
    conductivity: f64,
}

impl PowerData {
    pub fn stack_voltage(&self) -> f64 {
        self.stack_voltage
    }

    pub fn stack_current(&self) -> f64 {
        self.stack_current
    }

    pub fn stack_power(&self) -> f64 {
        self.stack_power
    }

    pub fn dcdc_out_voltage(&self) -> f64 {
        self.dcdc_out_voltage
    }

    pub fn dcdc_out_current(&self) -> f64 {
        self.dcdc_out_current
    }

    pub fn dcdc_out_power(&self) -> f64 {
        self.dcdc_out_power
    }

    pub fn dcdc_in_voltage(&self) -> f64 {
        self.dcdc_in_voltage
    }

    pub fn dcdc_in_current(&self) -> f64 {
        self.dcdc_in_current
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    /// Conductivity in µS/cm
    pub fn conductivity(&self) -> f64 {
        self.conductivity
    }

    pub fn set_stack(&mut self, voltage: f64, current: f64) {
        self.stack_voltage = voltage;
        self.stack_current = current;
        self.recompute();
    }

    pub fn set_stack_voltage(&mut self, voltage: f64) {
        self.set_stack(voltage, self.stack_current);
    }

    pub fn set_stack_current(&mut self, current: f64) {
        self.set_stack(self.stack_voltage, current);
    }

    pub fn set_dcdc_output(&mut self, voltage: f64, current: f64) {
        self.dcdc_out_voltage = voltage;
        self.dcdc_out_current = current;
        self.recompute();
    }

    pub fn set_dcdc_input(&mut self, voltage: f64, current: f64) {
        self.dcdc_in_voltage = voltage;
        self.dcdc_in_current = current;
    }

    pub fn set_conductivity(&mut self, conductivity: f64) {
        self.conductivity = conductivity;
    }

    fn recompute(&mut self) {
        self.stack_power = self.stack_voltage * self.stack_current / 1000.0;
        self.dcdc_out_power = self.dcdc_out_voltage * self.dcdc_out_current / 1000.0;
        self.efficiency = efficiency_percent(self.dcdc_out_power, self.stack_power);
    }
}

/// Hydrogen supply path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct H2Data {
    /// Cylinder (high side) pressure, kPa
    pub high_pressure: f64,
    /// Stack inlet pressure, kPa
    pub inlet_pressure: f64,
    pub outlet_pressure: f64,
    /// L/min
    pub inlet_flow: f64,
    pub inlet_temp: f64,
    /// Recirculation pump, rpm
    pub circulation_speed: f64,
    pub separator_pressure: f64,
    /// %vol
    pub concentration: f64,
}

/// Cathode air path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AirData {
    pub inlet_pressure: f64,
    pub inlet_temp: f64,
    pub outlet_pressure: f64,
    pub outlet_temp: f64,
    /// kg/h
    pub inlet_flow: f64,
    /// %RH
    pub humidity: f64,
    pub compressor_set_speed: f64,
    pub compressor_real_speed: f64,
}

/// Coolant loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaterData {
    pub inlet_pressure: f64,
    pub inlet_temp: f64,
    /// Stack coolant outlet, reported as stack temperature
    pub outlet_temp: f64,
    pub aux_outlet_temp: f64,
    pub aux_comp_temp: f64,
    /// %
    pub main_pump_speed: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TempData {
    /// DC/DC power stage (MOS) temperature
    pub dcdc_temp: f64,
}

/// Actuator states, positions and the raw fault vector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoData {
    pub h2_high_valve: bool,
    pub h2_heat_valve: bool,
    pub h2_purge_valve: bool,
    pub h2_injectors: [bool; 4],
    pub h2_circ_pump: bool,
    pub proportional_valve: bool,
    pub air_inlet_throttle: bool,
    pub air_outlet_throttle: bool,
    pub compressor: bool,
    pub bypass_valve: bool,
    pub main_pump: bool,
    pub main_fan: bool,
    pub main_fan_duty: u8,
    pub thermostat_state: u8,
    pub water_level_low: bool,
    pub aux_fan: bool,
    pub aux_pump: bool,
    pub ptc_heater: bool,
    pub thermostat_position: u8,
    pub air_inlet_throttle_pos: u8,
    pub air_outlet_throttle_pos: u8,
    /// Seconds until the next purge
    pub h2_purge_countdown: u8,
    /// Primary fault code as reported by the active table
    pub fault_code: u16,
    pub faults: [u8; 8],
}

/// Last-known state of the fuel-cell controller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineState {
    pub connected: bool,
    /// Milliseconds since the Unix epoch of the last decoded frame
    pub last_update: i64,
    pub status: StatusData,
    pub power: PowerData,
    pub h2: H2Data,
    pub air: AirData,
    pub water: WaterData,
    pub temps: TempData,
    pub io: IoData,
}

impl MachineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully decoded frame
    pub fn mark_received(&mut self, now_ms: i64) {
        self.connected = true;
        self.last_update = now_ms;
    }

    /// Restore every field to its default (session end)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
