//! CRC-CCITT frame check for S101
//!
//! Reflected polynomial 0x8408, initial value 0xFFFF. The complemented CRC
//! is appended low byte first; running the CRC over a message followed by
//! its CRC leaves the constant residue 0xF0B8.

use crate::error::{EmberError, EmberResult};

const INITIAL_CRC: u16 = 0xFFFF;
const GOOD_CRC: u16 = 0xF0B8;
const KEY: u16 = 0x8408; // Bit-reversed 0x1021

static CRC_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for (b, entry) in table.iter_mut().enumerate() {
        let mut v = b as u16;
        for _ in 0..8 {
            v = if v & 1 == 1 { (v >> 1) ^ KEY } else { v >> 1 };
        }
        *entry = v;
    }
    table
});

/// Running CRC over frame bytes
#[derive(Debug, Clone)]
pub struct CrcCalc {
    crc: u16,
}

impl CrcCalc {
    pub fn new() -> Self {
        Self { crc: INITIAL_CRC }
    }

    pub fn reset(&mut self) {
        self.crc = INITIAL_CRC;
    }

    pub fn update(&mut self, byte: u8) {
        self.crc = (self.crc >> 8) ^ CRC_TABLE[((self.crc ^ u16::from(byte)) & 0xFF) as usize];
    }

    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Complemented CRC, low byte first, as appended to a frame
    pub fn crc_bytes(&self) -> [u8; 2] {
        (!self.crc).to_le_bytes()
    }

    /// Check the residue after a message and its CRC have been fed
    pub fn validate(&self) -> EmberResult<()> {
        if self.crc != GOOD_CRC {
            return Err(EmberError::CrcMismatch {
                actual: self.crc,
                expected: GOOD_CRC,
            });
        }
        Ok(())
    }
}

impl Default for CrcCalc {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC bytes for a complete message
pub fn checksum(data: &[u8]) -> [u8; 2] {
    let mut calc = CrcCalc::new();
    calc.update_bytes(data);
    calc.crc_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value() {
        // CRC-16/X-25 check value for "123456789"
        let mut calc = CrcCalc::new();
        calc.update_bytes(b"123456789");
        assert_eq!(u16::from_le_bytes(calc.crc_bytes()), 0x906E);
    }

    #[test]
    fn test_residue() {
        let message = [0x00, 0x0E, 0x01, 0x01];
        let crc = checksum(&message);

        let mut calc = CrcCalc::new();
        calc.update_bytes(&message);
        calc.update_bytes(&crc);
        assert!(calc.validate().is_ok());

        calc.reset();
        calc.update_bytes(&message);
        calc.update_bytes(&[crc[0] ^ 0x01, crc[1]]);
        assert!(matches!(calc.validate(), Err(EmberError::CrcMismatch { expected: 0xF0B8, .. })));
    }
}
