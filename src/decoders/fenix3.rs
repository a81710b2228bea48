//! Fenix 3 layout
//!
//! ```text
//!  0 program version      13 air temperature
//!  1 calibration version  14 battery
//!  2 inputs               15 lambda
//!  3 outputs              16 idle period (u16 BE)
//!  4 MAP                  18 idle regulation
//!  5 crank period (u16)   19 pinging delay
//!  7 throttle             20 atmospheric pressure
//!  8 pinging              21 AFR correction (/128)
//!  9 injection (u16, 2µs) 22 speed
//! 11 advance (+ 32°)      23 faults (24 bits LE)
//! 12 water temperature
//! ```

use super::{
    battery_volts, be_u16, lambda_volts, pressure, rpm_from_period, temperature,
    throttle_degrees,
};
use crate::decoder::FrameDecoder;
use crate::error::DecodeError;
use crate::types::{BitField, EngineRecord};

/// Payload length transmitted by Fenix 3 ECUs.
pub const FENIX3_LEN: usize = 26;

/// Decoder for Fenix 3 frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fenix3Decoder;

impl FrameDecoder for Fenix3Decoder {
    type Record = EngineRecord;

    fn decode(&self, p: &[u8]) -> Result<EngineRecord, DecodeError> {
        if p.len() != FENIX3_LEN {
            return Err(DecodeError::length(FENIX3_LEN, p.len()));
        }

        let faults = u32::from_le_bytes([p[23], p[24], p[25], 0]);
        if faults >> 23 != 0 {
            return Err(DecodeError::field("faults", format!("unknown bits {faults:#08x}")));
        }

        Ok(EngineRecord {
            program_version: p[0],
            calibration_version: p[1],
            inputs: BitField::from(p[2]),
            outputs: BitField::from(p[3]),
            faults: BitField::new(faults),
            map: pressure(p[4]),
            rpm: rpm_from_period(be_u16(p, 5)),
            throttle: throttle_degrees(p[7]),
            engine_pinging: p[8] as i32,
            injection_us: be_u16(p, 9) as f32 * 2.0,
            advance: p[11] as i32 - 32,
            water_temp: temperature(p[12]),
            air_temp: temperature(p[13]),
            battery_v: battery_volts(p[14]),
            lambda_v: lambda_volts(p[15]),
            idle_period: be_u16(p, 16) as i32,
            idle_regulation: p[18] as i32,
            pinging_delay: p[19] as i32,
            atmospheric_pressure: pressure(p[20]),
            afr_correction: p[21] as f32 / 128.0,
            speed_kmh: p[22] as i32,
        })
    }

    fn name(&self) -> &str {
        "Fenix3"
    }
}
