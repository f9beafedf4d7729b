//! CRC-16/MODBUS, the checksum trailing every RTU frame.
//!
//! Reflected polynomial `0xA001`, initial value `0xFFFF`. On the wire the
//! checksum is sent low byte first.

const POLYNOMIAL: u16 = 0xA001;

const TABLE: [u16; 256] = build_table();

/// Computes the RTU checksum over `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0xFFFF, |crc, &byte| (crc >> 8) ^ TABLE[((crc ^ byte as u16) & 0xFF) as usize])
}

/// Bit-by-bit variant of [`crc16`]. The lookup table is built from the same step.
pub fn crc16_bitwise(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0xFFFF, |crc, &byte| update(crc, byte))
}

/// Checks the two trailing checksum bytes of an RTU frame.
pub fn verify_crc(frame: &[u8]) -> bool {
    match frame.len().checked_sub(2) {
        Some(end) => crc16(&frame[..end]).to_le_bytes() == frame[end..],
        None => false,
    }
}

const fn update(mut crc: u16, byte: u8) -> u16 {
    crc ^= byte as u16;
    let mut i = 0;
    while i < 8 {
        if crc & 0x0001 != 0 {
            crc = (crc >> 1) ^ POLYNOMIAL;
        } else {
            crc >>= 1;
        }
        i += 1;
    }
    crc
}

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = update(0, i as u8);
        i += 1;
    }
    table
}
