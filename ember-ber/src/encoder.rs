//! BER encoder for Ember+ values
//!
//! # Usage Example
//!
//! ```rust
//! use ember_ber::{BerEncoder, Tag};
//! use ember_core::Value;
//!
//! let mut encoder = BerEncoder::new();
//! encoder.encode_frame(Tag::context(true, 0), &Value::Integer(42)).unwrap();
//! assert_eq!(encoder.as_bytes(), &[0xA0, 0x03, 0x02, 0x01, 0x2A]);
//! ```

use crate::codec;
use crate::error::EmberResult;
use crate::sink::OctetSink;
use crate::types::{Length, Tag};
use ember_core::Value;

/// BER encoder writing into an [`OctetSink`]
///
/// The default sink is a growable `Vec<u8>`. Encoding into a
/// [`FixedSink`](crate::FixedSink) reports `BufferOverrun` once the slice is
/// full.
pub struct BerEncoder<S: OctetSink = Vec<u8>> {
    sink: S,
}

impl BerEncoder<Vec<u8>> {
    /// Create a new BER encoder
    pub fn new() -> Self {
        Self { sink: Vec::new() }
    }

    /// Create a new BER encoder with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sink: Vec::with_capacity(capacity),
        }
    }

    /// Get the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.sink
    }

    /// Get a reference to the encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.sink
    }

    /// Clear the encoder buffer
    pub fn clear(&mut self) {
        self.sink.clear();
    }
}

impl Default for BerEncoder<Vec<u8>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OctetSink> BerEncoder<S> {
    /// Create an encoder over an arbitrary sink
    pub fn with_sink(sink: S) -> Self {
        Self { sink }
    }

    /// Encode an identifier
    pub fn encode_tag(&mut self, tag: Tag) -> EmberResult<()> {
        tag.encode_to(&mut self.sink)
    }

    /// Encode a definite length
    pub fn encode_length(&mut self, length: usize) -> EmberResult<()> {
        Length::new(length).encode_to(&mut self.sink)
    }

    /// Encode the indefinite length marker (`0x80`)
    pub fn encode_indefinite_length(&mut self) -> EmberResult<()> {
        Length::Indefinite.encode_to(&mut self.sink)
    }

    /// Encode an end-of-contents marker (`00 00`)
    pub fn encode_end_of_contents(&mut self) -> EmberResult<()> {
        self.sink.write_bytes(&[0x00, 0x00])
    }

    /// Encode a TLV (Tag-Length-Value) triplet from raw contents octets
    pub fn encode_tlv(&mut self, tag: Tag, value: &[u8]) -> EmberResult<()> {
        self.encode_tag(tag)?;
        self.encode_length(value.len())?;
        self.sink.write_bytes(value)
    }

    /// Encode a value as its universal TLV
    pub fn encode_value(&mut self, value: &Value) -> EmberResult<()> {
        self.encode_tag(codec::universal_tag(value))?;
        self.encode_length(codec::encoded_length(value))?;
        codec::encode_payload(value, &mut self.sink)
    }

    /// Encode a value wrapped in an explicit outer tag
    ///
    /// This is the shape of every Glow property: `[tag] { universal TLV }`.
    pub fn encode_frame(&mut self, tag: Tag, value: &Value) -> EmberResult<()> {
        self.encode_tag(tag.to_container())?;
        self.encode_length(codec::tlv_length(value))?;
        self.encode_value(value)
    }

    /// Append raw, already encoded octets
    pub fn encode_raw(&mut self, bytes: &[u8]) -> EmberResult<()> {
        self.sink.write_bytes(bytes)
    }

    /// Number of octets written so far
    pub fn written(&self) -> usize {
        self.sink.written()
    }

    /// Get a reference to the underlying sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the encoder and return the sink
    pub fn into_inner(self) -> S {
        self.sink
    }
}

/// Length of a value encoded with [`BerEncoder::encode_frame`]
pub fn frame_length(tag: Tag, value: &Value) -> usize {
    let inner = codec::tlv_length(value);
    tag.encoded_length() + Length::new(inner).encoded_length() + inner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::FixedSink;
    use crate::error::EmberError;

    #[test]
    fn test_encode_integer() {
        let mut encoder = BerEncoder::new();
        encoder.encode_value(&Value::Integer(12345)).unwrap();
        assert_eq!(encoder.as_bytes(), &[0x02, 0x02, 0x30, 0x39]);
    }

    #[test]
    fn test_encode_octet_string() {
        let mut encoder = BerEncoder::new();
        encoder.encode_value(&Value::OctetString(b"Hello".to_vec())).unwrap();
        let bytes = encoder.into_bytes();
        assert_eq!(bytes[0], 0x04);
        assert_eq!(bytes[1], 5);
    }

    #[test]
    fn test_encode_frame() {
        let mut encoder = BerEncoder::new();
        let value = Value::Utf8String("ab".to_string());
        encoder.encode_frame(Tag::context(false, 1), &value).unwrap();
        assert_eq!(encoder.as_bytes(), &[0xA1, 0x04, 0x0C, 0x02, b'a', b'b']);
        assert_eq!(frame_length(Tag::context(true, 1), &value), encoder.written());
    }

    #[test]
    fn test_encode_indefinite() {
        let mut encoder = BerEncoder::new();
        encoder.encode_tag(Tag::SEQUENCE).unwrap();
        encoder.encode_indefinite_length().unwrap();
        encoder.encode_end_of_contents().unwrap();
        assert_eq!(encoder.as_bytes(), &[0x30, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_into_fixed_sink_overrun() {
        let mut storage = [0u8; 4];
        let mut encoder = BerEncoder::with_sink(FixedSink::new(&mut storage));
        let err = encoder
            .encode_value(&Value::OctetString(vec![0xAB; 8]))
            .unwrap_err();
        assert!(matches!(err, EmberError::BufferOverrun { .. }));
    }
}
