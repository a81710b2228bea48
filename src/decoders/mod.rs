//! Firmware-specific frame decoders and the registry that selects them
//!
//! | Name       | Payload | Notes                                  |
//! |------------|---------|----------------------------------------|
//! | `Fenix3`   | 26 B    | full fault map, 16-bit injection time  |
//! | `Fenix52B` | 20 B    | 16 fault bits, 8-bit injection time    |
//!
//! Both variants share the sensor scalings in this module.

mod fenix3;
mod fenix52b;
mod registry;

pub use fenix3::Fenix3Decoder;
pub use fenix52b::Fenix52BDecoder;
pub use registry::{DecoderRegistry, RegistryBuilder};

/// Big-endian `u16` at `offset`.
fn be_u16(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([payload[offset], payload[offset + 1]])
}

/// Engine speed from the crank period counter (µs per half turn).
fn rpm_from_period(period: u16) -> i32 {
    if period == 0 { 0 } else { (30_000_000 / period as u32) as i32 }
}

/// Coolant/air sensor scaling, °C.
fn temperature(raw: u8) -> i32 {
    (raw as i32 * 5) / 8 - 40
}

/// Manifold and atmospheric pressure scaling, mbar.
fn pressure(raw: u8) -> i32 {
    raw as i32 * 4 + 100
}

fn battery_volts(raw: u8) -> f32 {
    8.0 + raw as f32 * 0.0312
}

fn lambda_volts(raw: u8) -> f32 {
    raw as f32 * 0.00435
}

/// Throttle plate angle, degrees.
fn throttle_degrees(raw: u8) -> i32 {
    raw as i32 * 90 / 255
}
