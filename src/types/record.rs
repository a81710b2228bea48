//! Decoded engine record

use serde::{Deserialize, Serialize};

use super::flags::{BitField, faults, outputs};

/// One decoded XR25 frame.
///
/// Every decoder variant in [`crate::decoders`] fills the subset of fields
/// its firmware transmits and leaves the rest at their defaults. Records are
/// plain values: the mailbox and the series hooks copy them, never share them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineRecord {
    pub program_version: u8,
    pub calibration_version: u8,

    pub inputs: BitField,
    pub outputs: BitField,
    pub faults: BitField,

    /// Manifold absolute pressure, mbar.
    pub map: i32,
    pub rpm: i32,
    /// Throttle position, degrees.
    pub throttle: i32,
    pub engine_pinging: i32,
    pub injection_us: f32,
    /// Ignition advance, degrees.
    pub advance: i32,
    /// Coolant temperature, °C.
    pub water_temp: i32,
    /// Intake air temperature, °C.
    pub air_temp: i32,
    pub battery_v: f32,
    pub lambda_v: f32,
    pub idle_regulation: i32,
    pub idle_period: i32,
    pub pinging_delay: i32,
    /// Atmospheric pressure, mbar.
    pub atmospheric_pressure: i32,
    pub afr_correction: f32,
    pub speed_kmh: i32,
}

impl EngineRecord {
    /// True when the ECU drives the check-engine lamp or reports a severe fault.
    pub fn check_engine(&self) -> bool {
        self.outputs.has_flag(outputs::CHECK_ENGINE) || self.faults.has_flag(faults::SEVERE)
    }

    /// True when any present (not memorized) fault bit is set.
    pub fn has_active_fault(&self) -> bool {
        self.faults.has_flag(0x3FF)
    }
}
