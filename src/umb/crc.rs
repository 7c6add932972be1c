//! # CRC-16 Implementation
//!
//! Frame checksum for the UMB binary protocol.
//!
//! **Polynomial**: 0x8408 (reflected 0x1021, LSB first)
//! **Initial Value**: 0xFFFF
//! **Final XOR**: none

/// Reflected CRC-16 polynomial
const CRC16_POLY: u16 = 0x8408;

/// CRC-16 seed value
const CRC16_INIT: u16 = 0xFFFF;

/// Calculate the UMB frame checksum
///
/// Processes every byte bit by bit, least-significant bit first.
///
/// # Arguments
///
/// * `data` - Bytes to checksum (SOH through ETX inclusive)
///
/// # Returns
///
/// * `u16` - Calculated CRC, transmitted little-endian
///
/// # Examples
///
/// ```
/// use umb_poller::umb::crc::crc16;
///
/// assert_eq!(crc16(b"123456789"), 0x6F91);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        let mut byte = byte;

        for _ in 0..8 {
            let feedback = (crc ^ byte as u16) & 0x0001;
            crc >>= 1;
            if feedback == 1 {
                crc ^= CRC16_POLY;
            }
            byte >>= 1;
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16(&[]), CRC16_INIT);
    }

    #[test]
    fn test_crc16_check_value() {
        // CRC-16/MCRF4XX check value
        assert_eq!(crc16(b"123456789"), 0x6F91);
    }

    #[test]
    fn test_crc16_reference_response() {
        // Single-channel response from an ARS31 (channel 151, float)
        let data = [
            0x01, 0x10, 0x01, 0xF0, 0x01, 0x40, 0x0A, 0x02, 0x23, 0x10, 0x00, 0x97, 0x00, 0x16,
            0x66, 0x66, 0x96, 0xC1, 0x03,
        ];
        assert_eq!(crc16(&data), 0xEAFF);
    }

    #[test]
    fn test_crc16_reference_request() {
        let data = [0x01, 0x10, 0x01, 0x40, 0x01, 0xF0, 0x04, 0x02, 0x23, 0x10, 0x97, 0x00, 0x03];
        assert_eq!(crc16(&data), 0xC4D6);
    }

    #[test]
    fn test_crc16_order_sensitive() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let reversed = [0x04, 0x03, 0x02, 0x01];
        assert_ne!(crc16(&data), crc16(&reversed));
    }

    #[test]
    fn test_crc16_changes_with_data() {
        let data1 = [0x01, 0x10, 0x01, 0x40];
        let data2 = [0x01, 0x10, 0x01, 0x41];

        assert_ne!(crc16(&data1), crc16(&data2), "CRC should change when data changes");
    }
}
