//! Output sinks for the BER encoder
//!
//! Growable buffers (`Vec<u8>`, `BytesMut`) never fail. A [`FixedSink`]
//! over a caller-provided slice reports a buffer overrun instead of
//! silently truncating the encoding.

use crate::error::{EmberError, EmberResult};
use bytes::BytesMut;

/// Destination for encoded octets
pub trait OctetSink {
    /// Append a single octet
    fn write_byte(&mut self, byte: u8) -> EmberResult<()>;

    /// Append a run of octets
    fn write_bytes(&mut self, bytes: &[u8]) -> EmberResult<()>;

    /// Total number of octets written so far
    fn written(&self) -> usize;
}

impl OctetSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) -> EmberResult<()> {
        self.push(byte);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> EmberResult<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn written(&self) -> usize {
        self.len()
    }
}

impl OctetSink for BytesMut {
    fn write_byte(&mut self, byte: u8) -> EmberResult<()> {
        self.extend_from_slice(&[byte]);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> EmberResult<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn written(&self) -> usize {
        self.len()
    }
}

impl<S: OctetSink + ?Sized> OctetSink for &mut S {
    fn write_byte(&mut self, byte: u8) -> EmberResult<()> {
        (**self).write_byte(byte)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> EmberResult<()> {
        (**self).write_bytes(bytes)
    }

    fn written(&self) -> usize {
        (**self).written()
    }
}

/// Sink writing into a fixed-size slice
#[derive(Debug)]
pub struct FixedSink<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> FixedSink<'a> {
    /// Create a sink over `buffer`, starting at its first octet
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Octets still available
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// The written prefix of the buffer
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }
}

impl OctetSink for FixedSink<'_> {
    fn write_byte(&mut self, byte: u8) -> EmberResult<()> {
        self.write_bytes(&[byte])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> EmberResult<()> {
        if bytes.len() > self.remaining() {
            return Err(EmberError::BufferOverrun {
                needed: bytes.len(),
                available: self.remaining(),
            });
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    fn written(&self) -> usize {
        self.position
    }
}
