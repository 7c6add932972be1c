//! # Device Addressing
//!
//! A UMB address packs a 4-bit device class and a 12-bit device id into one
//! little-endian 16-bit field: `(class << 12) | (device_id & 0x0FFF)`.
//!
//! Out-of-range ids and classes are masked, never rejected.

use std::fmt;

/// Mask for the device id part of an address
pub const DEVICE_ID_MASK: u16 = 0x0FFF;

/// Bit offset of the device class
pub const CLASS_SHIFT: u16 = 12;

/// Pack a device id and class into a raw address
pub fn encode_address(device_id: u16, class: u16) -> u16 {
    (class << CLASS_SHIFT) | (device_id & DEVICE_ID_MASK)
}

/// Split a raw address into `(device_id, class)`
pub fn decode_address(raw: u16) -> (u16, u16) {
    (raw & DEVICE_ID_MASK, raw >> CLASS_SHIFT)
}

/// Packed 16-bit UMB address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(u16);

impl Address {
    /// Build an address from device id and class (masked)
    pub fn new(device_id: u16, class: u16) -> Self {
        Self(encode_address(device_id, class))
    }

    /// Wrap an already packed address
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Read an address from its little-endian wire form
    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn device_id(self) -> u16 {
        decode_address(self.0).0
    }

    pub fn class(self) -> u16 {
        decode_address(self.0).1
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X} (class {}, id {})", self.0, self.class(), self.device_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_address() {
        // ARS31 (class 4), id 1
        assert_eq!(encode_address(1, 4), 0x4001);
        // PC master
        assert_eq!(encode_address(1, 15), 0xF001);
    }

    #[test]
    fn test_decode_address() {
        assert_eq!(decode_address(0x4001), (1, 4));
        assert_eq!(decode_address(0xF001), (1, 15));
        assert_eq!(decode_address(0x7FFF), (0x0FFF, 7));
    }

    #[test]
    fn test_out_of_range_inputs_are_masked() {
        // id 0x1001 loses its top nibble
        assert_eq!(encode_address(0x1001, 4), 0x4001);
        // class 0x14 loses everything above 4 bits after the shift
        assert_eq!(encode_address(1, 0x14), 0x4001);
    }

    #[test]
    fn test_address_wire_bytes() {
        let address = Address::new(1, 4);
        assert_eq!(address.to_le_bytes(), [0x01, 0x40]);
        assert_eq!(Address::from_le_bytes([0x01, 0x40]), address);
        assert_eq!(address.device_id(), 1);
        assert_eq!(address.class(), 4);
    }

    #[test]
    fn test_address_display() {
        let address = Address::new(1, 4);
        assert_eq!(address.to_string(), "0x4001 (class 4, id 1)");
    }
}
