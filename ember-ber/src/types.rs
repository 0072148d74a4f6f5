//! BER encoding types (Tag, Length)

use crate::codec::{base128_length, decode_base128, encode_base128};
use crate::error::{EmberError, EmberResult};
use crate::sink::OctetSink;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of length octets accepted in long form
const MAX_LENGTH_OCTETS: usize = 8;

/// BER Tag Class
///
/// ASN.1 defines four tag classes:
/// - **Universal**: Standard ASN.1 types (INTEGER, OCTET STRING, etc.)
/// - **Application**: Application-specific types (Glow element types)
/// - **Context-specific**: Context-dependent types (Glow properties)
/// - **Private**: Private/implementation-specific types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TagClass {
    /// Universal class (00)
    Universal = 0,
    /// Application class (01)
    Application = 1,
    /// Context-specific class (10)
    ContextSpecific = 2,
    /// Private class (11)
    Private = 3,
}

impl TagClass {
    /// Get tag class from the identifier octet (bits 8-7)
    pub fn from_bits(bits: u8) -> Self {
        match (bits >> 6) & 0x03 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    /// Convert tag class to identifier octet bits
    pub fn to_bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// BER Tag
///
/// Two tags are equal iff class, number and container flag are all equal.
/// The container flag is set exactly when the value that follows is itself a
/// nested TLV sequence.
///
/// # Encoding Format
///
/// Short form (tag number 0-30):
/// ```text
/// Bits: 8 7 6 5 4 3 2 1
///       C C P T T T T T
/// ```
///
/// Extended form (tag number >= 31):
/// ```text
/// First byte:  C C P 1 1 1 1 1
/// Following bytes: 1 T T T T T T T  (last byte has bit 8 = 0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    class: TagClass,
    container: bool,
    number: u32,
}

impl Tag {
    /// Universal SEQUENCE / SEQUENCE OF (container)
    pub const SEQUENCE: Tag = Tag::new(TagClass::Universal, true, 16);
    /// Universal SET / SET OF (container)
    pub const SET: Tag = Tag::new(TagClass::Universal, true, 17);
    /// End-of-contents marker identifier (`00`)
    pub const END_OF_CONTENTS: Tag = Tag::new(TagClass::Universal, false, 0);

    /// Create a new BER tag
    pub const fn new(class: TagClass, container: bool, number: u32) -> Self {
        Self {
            class,
            container,
            number,
        }
    }

    /// Create a Universal class tag
    pub const fn universal(container: bool, number: u32) -> Self {
        Self::new(TagClass::Universal, container, number)
    }

    /// Create an Application class tag
    pub const fn application(container: bool, number: u32) -> Self {
        Self::new(TagClass::Application, container, number)
    }

    /// Create a Context-specific class tag
    pub const fn context(container: bool, number: u32) -> Self {
        Self::new(TagClass::ContextSpecific, container, number)
    }

    /// Create a Private class tag
    pub const fn private(container: bool, number: u32) -> Self {
        Self::new(TagClass::Private, container, number)
    }

    pub fn class(&self) -> TagClass {
        self.class
    }

    pub fn is_container(&self) -> bool {
        self.container
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Same tag with the container flag set
    pub fn to_container(self) -> Self {
        Self {
            container: true,
            ..self
        }
    }

    /// Same tag with the container flag cleared
    pub fn to_primitive(self) -> Self {
        Self {
            container: false,
            ..self
        }
    }

    /// Check whether this is the identifier of an end-of-contents marker
    pub fn is_end_of_contents(&self) -> bool {
        *self == Self::END_OF_CONTENTS
    }

    /// Number of octets the encoded tag occupies
    pub fn encoded_length(&self) -> usize {
        if self.number < 31 {
            1
        } else {
            1 + base128_length(self.number)
        }
    }

    /// Encode tag into a sink
    pub fn encode_to<S: OctetSink + ?Sized>(&self, sink: &mut S) -> EmberResult<()> {
        let class_bits = self.class.to_bits();
        let container_bit = if self.container { 0x20 } else { 0x00 };

        if self.number < 31 {
            sink.write_byte(class_bits | container_bit | self.number as u8)
        } else {
            sink.write_byte(class_bits | container_bit | 0x1F)?;
            encode_base128(self.number, sink)
        }
    }

    /// Encode tag to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.encoded_length());
        // Writing into a Vec cannot fail
        let _ = self.encode_to(&mut result);
        result
    }

    /// Check whether `data` holds a complete identifier
    ///
    /// Used by the streaming reader to know when to stop accumulating
    /// identifier octets.
    pub fn is_complete(data: &[u8]) -> bool {
        match data.first() {
            None => false,
            Some(first) if first & 0x1F != 0x1F => true,
            Some(_) => data.len() > 1 && data[data.len() - 1] & 0x80 == 0,
        }
    }

    /// Decode tag from bytes
    ///
    /// # Returns
    /// Returns `Ok((Tag, bytes_consumed))` if successful
    ///
    /// # Error Handling
    /// Returns error if the buffer is too short or the tag number does not
    /// fit in 32 bits.
    pub fn decode(data: &[u8]) -> EmberResult<(Self, usize)> {
        let first_byte = *data
            .first()
            .ok_or_else(|| EmberError::Asn1Decoding("Empty buffer for tag decoding".to_string()))?;

        let class = TagClass::from_bits(first_byte);
        let container = (first_byte & 0x20) != 0;
        let tag_bits = first_byte & 0x1F;

        if tag_bits < 31 {
            return Ok((Self::new(class, container, tag_bits as u32), 1));
        }

        let mut pos = 1;
        let number = decode_base128(data, &mut pos)
            .map_err(|e| EmberError::Asn1Decoding(format!("Invalid extended tag: {}", e)))?;
        Ok((Self::new(class, container, number), pos))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            TagClass::Universal => "U",
            TagClass::Application => "A",
            TagClass::ContextSpecific => "C",
            TagClass::Private => "P",
        };
        write!(f, "{}-{}", class, self.number)?;
        if self.container {
            f.write_str("*")?;
        }
        Ok(())
    }
}

/// BER Length encoding
///
/// - **Short form**: lengths 0-127 (1 byte)
/// - **Long form**: lengths > 127 (`0x80 | n`, then `n` octets, big-endian)
/// - **Indefinite**: `0x80`, the contents end with an end-of-contents marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Length {
    /// Definite length in octets
    Definite(usize),
    /// Contents terminated by an end-of-contents marker
    Indefinite,
}

impl Length {
    /// Create a definite length
    pub fn new(length: usize) -> Self {
        Length::Definite(length)
    }

    /// Get the length value, `None` for indefinite lengths
    pub fn value(&self) -> Option<usize> {
        match self {
            Length::Definite(l) => Some(*l),
            Length::Indefinite => None,
        }
    }

    pub fn is_indefinite(&self) -> bool {
        matches!(self, Length::Indefinite)
    }

    /// Number of octets the encoded length occupies
    pub fn encoded_length(&self) -> usize {
        match self {
            Length::Indefinite => 1,
            Length::Definite(l) if *l < 128 => 1,
            Length::Definite(l) => 1 + length_octets(*l),
        }
    }

    /// Encode length into a sink
    pub fn encode_to<S: OctetSink + ?Sized>(&self, sink: &mut S) -> EmberResult<()> {
        match *self {
            Length::Indefinite => sink.write_byte(0x80),
            Length::Definite(length) if length < 128 => sink.write_byte(length as u8),
            Length::Definite(length) => {
                let num_bytes = length_octets(length);
                sink.write_byte(0x80 | num_bytes as u8)?;
                for i in (0..num_bytes).rev() {
                    sink.write_byte(((length >> (i * 8)) & 0xFF) as u8)?;
                }
                Ok(())
            }
        }
    }

    /// Encode length to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.encoded_length());
        let _ = self.encode_to(&mut result);
        result
    }

    /// Check whether `data` holds a complete length field
    pub fn is_complete(data: &[u8]) -> bool {
        match data.first() {
            None => false,
            Some(first) if first & 0x80 == 0 => true,
            Some(first) => data.len() > (first & 0x7F) as usize,
        }
    }

    /// Decode length from bytes
    ///
    /// # Returns
    /// Returns `Ok((Length, bytes_consumed))` if successful
    ///
    /// # Error Handling
    /// Returns error if:
    /// - Buffer is too short
    /// - The reserved length octet `0xFF` is used
    /// - More than 8 length octets are announced
    pub fn decode(data: &[u8]) -> EmberResult<(Self, usize)> {
        let first_byte = *data
            .first()
            .ok_or_else(|| EmberError::Asn1Decoding("Empty buffer for length decoding".to_string()))?;

        if (first_byte & 0x80) == 0 {
            return Ok((Length::Definite(first_byte as usize), 1));
        }

        let num_bytes = (first_byte & 0x7F) as usize;
        if num_bytes == 0 {
            return Ok((Length::Indefinite, 1));
        }

        if first_byte == 0xFF {
            return Err(EmberError::Asn1Decoding(
                "Reserved length octet 0xFF".to_string(),
            ));
        }

        if num_bytes > MAX_LENGTH_OCTETS || num_bytes > std::mem::size_of::<usize>() {
            return Err(EmberError::Asn1Decoding(format!(
                "Length encoding too large: {} bytes (max {})",
                num_bytes, MAX_LENGTH_OCTETS
            )));
        }

        if data.len() < 1 + num_bytes {
            return Err(EmberError::Asn1Decoding(format!(
                "Buffer too short for long form length: need {} bytes, got {}",
                1 + num_bytes,
                data.len()
            )));
        }

        let length = data[1..=num_bytes]
            .iter()
            .fold(0usize, |acc, &byte| (acc << 8) | byte as usize);

        Ok((Length::Definite(length), 1 + num_bytes))
    }
}

impl From<usize> for Length {
    fn from(length: usize) -> Self {
        Length::Definite(length)
    }
}

/// Number of big-endian octets needed for a long-form length
fn length_octets(mut length: usize) -> usize {
    let mut num_bytes = 0;
    while length > 0 {
        num_bytes += 1;
        length >>= 8;
    }
    num_bytes.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSES: [TagClass; 4] = [
        TagClass::Universal,
        TagClass::Application,
        TagClass::ContextSpecific,
        TagClass::Private,
    ];

    #[test]
    fn test_tag_short_form() {
        let tag = Tag::universal(false, 2);
        let encoded = tag.encode();
        assert_eq!(encoded, vec![0x02]);
        assert_eq!(tag.encoded_length(), 1);
    }

    #[test]
    fn test_tag_container() {
        let tag = Tag::application(true, 0);
        assert_eq!(tag.encode(), vec![0x60]);
        assert_eq!(Tag::context(true, 1).encode(), vec![0xA1]);
    }

    #[test]
    fn test_tag_boundary_numbers() {
        assert_eq!(Tag::application(false, 30).encode(), vec![0x5E]);
        assert_eq!(Tag::application(false, 31).encode(), vec![0x5F, 0x1F]);
        assert_eq!(Tag::context(true, 128).encode(), vec![0xBF, 0x81, 0x00]);
        assert_eq!(Tag::private(false, 16384).encode(), vec![0xDF, 0x81, 0x80, 0x00]);
    }

    #[test]
    fn test_tag_round_trip_all_classes() {
        for class in CLASSES {
            for number in [0u32, 30, 31, 128, 16384, u32::MAX] {
                for container in [false, true] {
                    let tag = Tag::new(class, container, number);
                    let encoded = tag.encode();
                    assert_eq!(encoded.len(), tag.encoded_length());
                    assert!(Tag::is_complete(&encoded));
                    let (decoded, consumed) = Tag::decode(&encoded).unwrap();
                    assert_eq!(decoded, tag);
                    assert_eq!(consumed, encoded.len());
                }
            }
        }
    }

    #[test]
    fn test_tag_decode_errors() {
        assert!(Tag::decode(&[]).is_err());
        // Extended form without continuation octets
        assert!(Tag::decode(&[0x1F]).is_err());
        // Unterminated continuation
        assert!(Tag::decode(&[0x1F, 0x81]).is_err());
        // More than 32 bits
        assert!(Tag::decode(&[0x1F, 0x90, 0x80, 0x80, 0x80, 0x00]).is_err());
    }

    #[test]
    fn test_tag_is_complete() {
        assert!(!Tag::is_complete(&[]));
        assert!(!Tag::is_complete(&[0x7F]));
        assert!(!Tag::is_complete(&[0x7F, 0x81]));
        assert!(Tag::is_complete(&[0x7F, 0x81, 0x00]));
    }

    #[test]
    fn test_length_short() {
        let length = Length::new(100);
        assert_eq!(length.encode(), vec![100]);
        assert_eq!(length.encoded_length(), 1);
    }

    #[test]
    fn test_length_long() {
        assert_eq!(Length::new(127).encode(), vec![0x7F]);
        assert_eq!(Length::new(128).encode(), vec![0x81, 0x80]);
        assert_eq!(Length::new(1000).encode(), vec![0x82, 0x03, 0xE8]);
        assert_eq!(Length::new(1000).encoded_length(), 3);
    }

    #[test]
    fn test_length_indefinite() {
        assert_eq!(Length::Indefinite.encode(), vec![0x80]);
        let (length, consumed) = Length::decode(&[0x80]).unwrap();
        assert_eq!(length, Length::Indefinite);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_length_decode() {
        let (length, consumed) = Length::decode(&[100]).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(length.value(), Some(100));

        for value in [0usize, 127, 128, 255, 256, 65535, 1 << 20] {
            let encoded = Length::new(value).encode();
            assert!(Length::is_complete(&encoded));
            let (decoded, consumed) = Length::decode(&encoded).unwrap();
            assert_eq!(decoded, Length::Definite(value));
            assert_eq!(consumed, encoded.len());
        }
    }

    #[test]
    fn test_length_decode_errors() {
        assert!(Length::decode(&[]).is_err());
        assert!(Length::decode(&[0xFF]).is_err());
        assert!(Length::decode(&[0x89, 0, 0, 0, 0, 0, 0, 0, 0, 1]).is_err());
        assert!(Length::decode(&[0x82, 0x01]).is_err());
    }
}
