//! Frame escaping and CRC

use crate::crc::CrcCalc;
use crate::error::EmberResult;
use crate::frame::{BOF, CE, EOF, INVALID, S101Frame, XOR};
use bytes::{BufMut, BytesMut};

/// Writes S101 frames as escaped byte sequences
///
/// Output layout: `BOF`, escaped message, escaped CRC (low byte first), `EOF`.
pub struct S101Encoder;

impl S101Encoder {
    /// Encode one frame into a new buffer
    pub fn encode(frame: &S101Frame) -> EmberResult<BytesMut> {
        let mut out = BytesMut::new();
        Self::encode_into(frame, &mut out)?;
        Ok(out)
    }

    /// Append one encoded frame to `out`, returning the bytes written
    pub fn encode_into(frame: &S101Frame, out: &mut BytesMut) -> EmberResult<usize> {
        let message = frame.encode()?;
        let start = out.len();
        Self::write_message(&message, out);
        log::trace!("Encoded {} as {} bytes", frame, out.len() - start);
        Ok(out.len() - start)
    }

    /// Wrap an unescaped message in BOF/EOF with its CRC
    pub fn write_message(message: &[u8], out: &mut BytesMut) {
        let mut crc = CrcCalc::new();
        crc.update_bytes(message);

        out.reserve(message.len() + message.len() / 8 + 6);
        out.put_u8(BOF);
        for &byte in message {
            Self::put_escaped(byte, out);
        }
        for byte in crc.crc_bytes() {
            Self::put_escaped(byte, out);
        }
        out.put_u8(EOF);
    }

    fn put_escaped(byte: u8, out: &mut BytesMut) {
        if byte >= INVALID {
            out.put_u8(CE);
            out.put_u8(byte ^ XOR);
        } else {
            out.put_u8(byte);
        }
    }
}
