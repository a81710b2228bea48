//! Bit-flag groups carried by XR25 frames
//!
//! Each group is transmitted as raw bits and kept as a [`BitField`]; the
//! constants below name the bits the dashboard knows about.

use serde::{Deserialize, Serialize};

/// A group of digital inputs, outputs or fault bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitField(pub u32);

impl BitField {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Check if a specific bit position is set.
    pub fn is_set(&self, bit: u32) -> bool {
        bit < 32 && (self.0 & (1 << bit)) != 0
    }

    /// Check if any bit of `mask` is set.
    pub fn has_flag(&self, mask: u32) -> bool {
        (self.0 & mask) != 0
    }

    /// Raw bits.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Number of bits set.
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }
}

impl From<u8> for BitField {
    fn from(value: u8) -> Self {
        Self(value as u32)
    }
}

/// Digital inputs read by the ECU.
pub mod inputs {
    pub const AC_REQUEST: u32 = 0x0001;
    pub const AC_COMPRESSOR: u32 = 0x0002;
    pub const THROTTLE_CLOSED: u32 = 0x0004;
    pub const PARKED: u32 = 0x0008;
    pub const THROTTLE_FULL: u32 = 0x0010;
}

/// Digital outputs driven by the ECU.
pub mod outputs {
    pub const PUMP_ENABLE: u32 = 0x0001;
    pub const IDLE_REGULATION: u32 = 0x0002;
    pub const WASTEGATE_REGULATION: u32 = 0x0004;
    pub const EGR_ENABLE: u32 = 0x0008;
    pub const CHECK_ENGINE: u32 = 0x0010;
}

/// Fault bits; `MEM_*` entries are faults stored in memory rather than present.
pub mod faults {
    pub const MAP: u32 = 1 << 0;
    pub const SPEED_SENSOR: u32 = 1 << 1;
    pub const LAMBDA_TEMP: u32 = 1 << 2;
    pub const LAMBDA: u32 = 1 << 3;
    pub const WATER_OPEN_CIRCUIT: u32 = 1 << 4;
    pub const WATER_SHORT_CIRCUIT: u32 = 1 << 5;
    pub const AIR_OPEN_CIRCUIT: u32 = 1 << 6;
    pub const AIR_SHORT_CIRCUIT: u32 = 1 << 7;
    pub const TPS_LOW: u32 = 1 << 8;
    pub const TPS_HIGH: u32 = 1 << 9;
    pub const MEM_WATER_OPEN_CIRCUIT: u32 = 1 << 10;
    pub const MEM_WATER_SHORT_CIRCUIT: u32 = 1 << 11;
    pub const MEM_AIR_OPEN_CIRCUIT: u32 = 1 << 12;
    pub const MEM_AIR_SHORT_CIRCUIT: u32 = 1 << 13;
    pub const MEM_TPS_LOW: u32 = 1 << 14;
    pub const MEM_TPS_HIGH: u32 = 1 << 15;
    pub const EEPROM_CHECKSUM: u32 = 1 << 16;
    pub const PROGRAM_CHECKSUM: u32 = 1 << 17;
    pub const PUMP: u32 = 1 << 18;
    pub const WASTEGATE: u32 = 1 << 19;
    pub const EGR: u32 = 1 << 20;
    pub const IDLE_REGULATION: u32 = 1 << 21;
    pub const INJECTORS: u32 = 1 << 22;

    /// Faults that light the check-engine lamp on their own.
    pub const SEVERE: u32 = EEPROM_CHECKSUM | PROGRAM_CHECKSUM | INJECTORS | PUMP;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_queries() {
        let bits = BitField::new(inputs::PARKED | inputs::AC_REQUEST);
        assert!(bits.has_flag(inputs::PARKED));
        assert!(!bits.has_flag(inputs::THROTTLE_FULL));
        assert!(bits.is_set(0));
        assert!(bits.is_set(3));
        assert!(!bits.is_set(40));
        assert_eq!(bits.count(), 2);
    }

    #[test]
    fn severe_mask_covers_checksums() {
        let bits = BitField::new(faults::EEPROM_CHECKSUM);
        assert!(bits.has_flag(faults::SEVERE));
        assert!(!BitField::new(faults::TPS_LOW).has_flag(faults::SEVERE));
    }
}
