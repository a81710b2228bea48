//! Fenix 5 (52B firmware) layout
//!
//! Same leading fields as Fenix 3 up to byte 8; after that the frame is
//! narrower: injection time is a single byte in 16 µs steps, only the first
//! sixteen fault bits exist and atmospheric pressure trails the frame.

use super::{
    battery_volts, be_u16, lambda_volts, pressure, rpm_from_period, temperature,
    throttle_degrees,
};
use crate::decoder::FrameDecoder;
use crate::error::DecodeError;
use crate::types::{BitField, EngineRecord};

/// Payload length transmitted by Fenix 5 / 52B ECUs.
pub const FENIX52B_LEN: usize = 20;

/// Decoder for Fenix 5 frames running the 52B firmware.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fenix52BDecoder;

impl FrameDecoder for Fenix52BDecoder {
    type Record = EngineRecord;

    fn decode(&self, p: &[u8]) -> Result<EngineRecord, DecodeError> {
        if p.len() != FENIX52B_LEN {
            return Err(DecodeError::length(FENIX52B_LEN, p.len()));
        }
        if p[0] == 0 {
            return Err(DecodeError::field("program_version", "zero"));
        }

        Ok(EngineRecord {
            program_version: p[0],
            calibration_version: p[1],
            inputs: BitField::from(p[2]),
            outputs: BitField::from(p[3]),
            map: pressure(p[4]),
            rpm: rpm_from_period(be_u16(p, 5)),
            throttle: throttle_degrees(p[7]),
            engine_pinging: p[8] as i32,
            injection_us: p[9] as f32 * 16.0,
            advance: p[10] as i32 - 32,
            water_temp: temperature(p[11]),
            air_temp: temperature(p[12]),
            battery_v: battery_volts(p[13]),
            lambda_v: lambda_volts(p[14]),
            idle_regulation: p[15] as i32,
            speed_kmh: p[16] as i32,
            faults: BitField::new(be_u16(p, 17) as u32),
            atmospheric_pressure: pressure(p[19]),
            ..Default::default()
        })
    }

    fn name(&self) -> &str {
        "Fenix52B"
    }
}
