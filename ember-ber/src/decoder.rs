//! BER decoder over a complete buffer
//!
//! For byte streams arriving in arbitrary chunks use
//! [`AsyncBerReader`](crate::reader::AsyncBerReader) instead.
//!
//! # Usage Example
//!
//! ```rust
//! use ember_ber::BerDecoder;
//! use ember_core::Value;
//!
//! let data = [0x02, 0x01, 0x2A];
//! let mut decoder = BerDecoder::new(&data);
//! assert_eq!(decoder.decode_value().unwrap(), Value::Integer(42));
//! ```

use crate::codec;
use crate::error::{EmberError, EmberResult};
use crate::types::{Length, Tag};
use ember_core::Value;

/// BER decoder for complete buffers
///
/// The decoder maintains a position pointer that advances as data is
/// decoded, allowing sequential decoding of multiple values from the same
/// buffer.
pub struct BerDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BerDecoder<'a> {
    /// Create a new BER decoder
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Get current position in buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get remaining bytes
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Check if there is more data to decode
    pub fn has_remaining(&self) -> bool {
        self.position < self.buffer.len()
    }

    fn read_bytes(&mut self, count: usize) -> EmberResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(EmberError::Asn1Decoding(format!(
                "Declared length exceeds buffer: need {} bytes, have {}",
                count,
                self.remaining()
            )));
        }
        let start = self.position;
        self.position += count;
        Ok(&self.buffer[start..start + count])
    }

    /// Decode an identifier
    pub fn decode_tag(&mut self) -> EmberResult<Tag> {
        let (tag, consumed) = Tag::decode(&self.buffer[self.position..])?;
        self.position += consumed;
        Ok(tag)
    }

    /// Decode a length field
    pub fn decode_length(&mut self) -> EmberResult<Length> {
        let (length, consumed) = Length::decode(&self.buffer[self.position..])?;
        self.position += consumed;
        Ok(length)
    }

    /// Decode a TLV (Tag-Length-Value) triplet
    ///
    /// # Returns
    /// Returns the tag and the contents octets. For indefinite-length
    /// containers the contents exclude the terminating end-of-contents
    /// marker.
    pub fn decode_tlv(&mut self) -> EmberResult<(Tag, &'a [u8])> {
        let tag = self.decode_tag()?;
        match self.decode_length()? {
            Length::Definite(len) => Ok((tag, self.read_bytes(len)?)),
            Length::Indefinite => {
                if !tag.is_container() {
                    return Err(EmberError::Asn1Decoding(format!(
                        "Indefinite length on primitive tag {}",
                        tag
                    )));
                }
                let start = self.position;
                loop {
                    if self.buffer[self.position..].starts_with(&[0x00, 0x00]) {
                        let contents = &self.buffer[start..self.position];
                        self.position += 2;
                        return Ok((tag, contents));
                    }
                    if !self.has_remaining() {
                        return Err(EmberError::Asn1Decoding(
                            "Missing end-of-contents marker".to_string(),
                        ));
                    }
                    self.skip_tlv()?;
                }
            }
        }
    }

    /// Decode a universal TLV into a value
    pub fn decode_value(&mut self) -> EmberResult<Value> {
        let (tag, contents) = self.decode_tlv()?;
        codec::decode_value(tag, contents)
    }

    /// Decode an explicitly tagged value: `[tag] { universal TLV }`
    pub fn decode_frame(&mut self) -> EmberResult<(Tag, Value)> {
        let (tag, contents) = self.decode_tlv()?;
        let mut inner = BerDecoder::new(contents);
        let value = inner.decode_value()?;
        if inner.has_remaining() {
            return Err(EmberError::Asn1Decoding(format!(
                "{} trailing bytes inside {}",
                inner.remaining(),
                tag
            )));
        }
        Ok((tag, value))
    }

    /// Skip a TLV (useful for skipping unknown properties)
    ///
    /// # Returns
    /// Returns the number of bytes skipped.
    pub fn skip_tlv(&mut self) -> EmberResult<usize> {
        let start = self.position;
        self.decode_tlv()?;
        Ok(self.position - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::BerEncoder;

    #[test]
    fn test_decode_integer() {
        let mut encoder = BerEncoder::new();
        encoder.encode_value(&Value::Integer(12345)).unwrap();
        let encoded = encoder.into_bytes();

        let mut decoder = BerDecoder::new(&encoded);
        assert_eq!(decoder.decode_value().unwrap(), Value::Integer(12345));
        assert!(!decoder.has_remaining());
    }

    #[test]
    fn test_decode_frame() {
        let mut encoder = BerEncoder::new();
        encoder.encode_frame(Tag::context(true, 2), &Value::Real(0.25)).unwrap();
        encoder.encode_frame(Tag::context(true, 0), &Value::from("x")).unwrap();
        let encoded = encoder.into_bytes();

        let mut decoder = BerDecoder::new(&encoded);
        assert_eq!(decoder.decode_frame().unwrap(), (Tag::context(true, 2), Value::Real(0.25)));
        assert_eq!(decoder.decode_frame().unwrap(), (Tag::context(true, 0), Value::from("x")));
    }

    #[test]
    fn test_decode_length_exceeds_buffer() {
        let data = [0x04, 0x05, 0x01, 0x02];
        let mut decoder = BerDecoder::new(&data);
        assert!(matches!(decoder.decode_tlv(), Err(EmberError::Asn1Decoding(_))));
    }

    #[test]
    fn test_skip_indefinite_container() {
        // SEQUENCE (indefinite) { INTEGER 1 } EOC, then NULL
        let data = [0x30, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00, 0x05, 0x00];
        let mut decoder = BerDecoder::new(&data);
        assert_eq!(decoder.skip_tlv().unwrap(), 7);
        assert_eq!(decoder.decode_value().unwrap(), Value::Null);
    }

    #[test]
    fn test_indefinite_without_terminator() {
        let data = [0x30, 0x80, 0x02, 0x01, 0x01];
        let mut decoder = BerDecoder::new(&data);
        assert!(decoder.decode_tlv().is_err());
    }
}
