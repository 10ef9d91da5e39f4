//! CRC-16/MODBUS checksum.
//!
//! Reflected polynomial 0xA001, seed 0xFFFF, processed one bit at a time
//! LSB-first. This is the checksum the instrument firmware computes over
//! `cmd ++ len ++ payload`.

/// Seed value of the checksum register.
pub const CRC16_INIT: u16 = 0xFFFF;
/// Reflected generator polynomial.
pub const CRC16_POLY: u16 = 0xA001;

/// Compute the CRC-16 of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    crc16_update(CRC16_INIT, data)
}

/// Continue a CRC-16 computation from a previous register value.
pub fn crc16_update(mut crc: u16, data: &[u8]) -> u16 {
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_empty_get_device_id() {
        // cmd 0x01, len 0
        assert_eq!(crc16(&[0x01, 0x00]), 0x2000);
    }

    #[test]
    fn test_empty_input_is_seed() {
        assert_eq!(crc16(&[]), CRC16_INIT);
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let data = [0x80, 0x02, 0x10, 0x00];
        let partial = crc16_update(CRC16_INIT, &data[..2]);
        assert_eq!(crc16_update(partial, &data[2..]), crc16(&data));
    }
}
