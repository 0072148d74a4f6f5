//! Byte-fed S101 frame decoder

use crate::crc::CrcCalc;
use crate::error::{EmberError, EmberResult};
use crate::frame::{BOF, CE, EOF, INVALID, S101Frame, XOR};
use crate::config::DEFAULT_MAX_FRAME_SIZE;

/// Minimum unescaped frame: slot, message type, command, version and CRC
const MIN_FRAME_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Outside a frame, waiting for BOF
    Idle,
    InFrame,
    /// Last byte was CE
    Escaped,
    /// Frame exceeded its size limit, skipping to the next BOF or EOF
    Discarding,
}

/// Reconstructs frames from an arbitrarily chunked byte stream
///
/// Bytes outside BOF/EOF are ignored. Every completed frame yields one
/// result; a bad frame never affects the frames after it.
#[derive(Debug)]
pub struct S101Decoder {
    state: State,
    buffer: Vec<u8>,
    /// Escaped bytes seen in the current frame
    raw_length: usize,
    max_frame_size: usize,
}

impl S101Decoder {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            state: State::Idle,
            buffer: Vec::new(),
            raw_length: 0,
            max_frame_size,
        }
    }

    /// Whether the decoder sits between frames
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.buffer.clear();
        self.raw_length = 0;
    }

    /// Feed bytes, returning every frame completed by them
    pub fn feed(&mut self, data: &[u8]) -> Vec<EmberResult<S101Frame>> {
        let mut results = Vec::new();
        for &byte in data {
            if let Some(result) = self.push(byte) {
                results.push(result);
            }
        }
        results
    }

    /// Feed one byte
    pub fn push(&mut self, byte: u8) -> Option<EmberResult<S101Frame>> {
        if byte == BOF {
            if matches!(self.state, State::InFrame | State::Escaped) {
                log::warn!("BOF inside frame, dropping {} buffered bytes", self.buffer.len());
            }
            self.buffer.clear();
            self.raw_length = 1;
            self.state = State::InFrame;
            return None;
        }

        match self.state {
            State::Idle => {
                log::trace!("Ignoring byte 0x{:02X} outside frame", byte);
                None
            }
            State::Discarding => {
                if byte == EOF {
                    self.state = State::Idle;
                }
                None
            }
            State::InFrame | State::Escaped => {
                self.raw_length += 1;
                if byte == EOF {
                    let result = if self.state == State::Escaped {
                        Err(EmberError::FrameInvalid("Frame ends after escape byte".to_string()))
                    } else {
                        Self::complete(&self.buffer)
                    };
                    self.buffer.clear();
                    self.state = State::Idle;
                    return Some(result);
                }
                if self.raw_length > self.max_frame_size {
                    log::warn!(
                        "Frame exceeds {} bytes, dropping until next frame",
                        self.max_frame_size
                    );
                    self.buffer.clear();
                    self.state = State::Discarding;
                    return Some(Err(EmberError::FrameInvalid(format!(
                        "Frame exceeds maximum size of {} bytes",
                        self.max_frame_size
                    ))));
                }
                self.push_content(byte)
            }
        }
    }

    fn push_content(&mut self, byte: u8) -> Option<EmberResult<S101Frame>> {
        if self.state == State::Escaped {
            self.buffer.push(byte ^ XOR);
            self.state = State::InFrame;
            return None;
        }
        if byte == CE {
            self.state = State::Escaped;
            return None;
        }
        if byte >= INVALID {
            self.buffer.clear();
            self.state = State::Discarding;
            return Some(Err(EmberError::FrameInvalid(format!(
                "Unescaped byte 0x{:02X} inside frame",
                byte
            ))));
        }
        self.buffer.push(byte);
        None
    }

    fn complete(buffer: &[u8]) -> EmberResult<S101Frame> {
        if buffer.len() < MIN_FRAME_LENGTH {
            return Err(EmberError::FrameInvalid(format!(
                "Frame too short: {} bytes",
                buffer.len()
            )));
        }
        let mut crc = CrcCalc::new();
        crc.update_bytes(buffer);
        crc.validate()?;

        let frame = S101Frame::decode(&buffer[..buffer.len() - 2])?;
        log::trace!("Decoded {}", frame);
        Ok(frame)
    }
}

impl Default for S101Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::S101Encoder;
    use crate::frame::{Dtd, PackageFlags};
    use bytes::Bytes;

    fn packet_frame(payload: &'static [u8]) -> S101Frame {
        S101Frame::ember_packet(0, PackageFlags::SINGLE, Dtd::Glow, &[0x1F, 0x02], Bytes::from_static(payload))
    }

    #[test]
    fn test_decode_round_trip() {
        let frame = packet_frame(&[0x60, 0x03, 0xFE, 0xFF, 0xFD]);
        let bytes = S101Encoder::encode(&frame).unwrap();
        let mut decoder = S101Decoder::new();
        let results = decoder.feed(&bytes);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap(), &frame);
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_chunk_invariance() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&S101Encoder::encode(&packet_frame(b"hello")).unwrap());
        stream.extend_from_slice(&S101Encoder::encode(&S101Frame::keep_alive_request(0)).unwrap());
        stream.extend_from_slice(&S101Encoder::encode(&S101Frame::provider_state(1, 0)).unwrap());

        let mut whole = S101Decoder::new();
        let expected: Vec<S101Frame> = whole.feed(&stream).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(expected.len(), 3);

        let mut bytewise = S101Decoder::new();
        let mut actual = Vec::new();
        for byte in &stream {
            actual.extend(bytewise.feed(std::slice::from_ref(byte)).into_iter().map(|r| r.unwrap()));
        }
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_garbage_between_frames() {
        let frame = S101Frame::keep_alive_response(0);
        let mut stream = vec![0x01, 0x02, EOF, 0x7E];
        stream.extend_from_slice(&S101Encoder::encode(&frame).unwrap());
        stream.extend_from_slice(&[0x55, 0xAA]);

        let mut decoder = S101Decoder::new();
        let results = decoder.feed(&stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap(), &frame);
    }

    #[test]
    fn test_crc_error_does_not_desync() {
        let mut bad = S101Encoder::encode(&packet_frame(b"abc")).unwrap().to_vec();
        let payload_at = bad.len() - 6;
        bad[payload_at] ^= 0x01;
        let good = S101Encoder::encode(&packet_frame(b"xyz")).unwrap();

        let mut decoder = S101Decoder::new();
        let mut results = decoder.feed(&bad);
        results.extend(decoder.feed(&good));
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(EmberError::CrcMismatch { .. })));
        assert_eq!(results[1].as_ref().unwrap(), &packet_frame(b"xyz"));
    }

    #[test]
    fn test_bof_restarts_frame() {
        let frame = S101Frame::keep_alive_request(2);
        let mut stream = vec![BOF, 0x00, 0x0E];
        stream.extend_from_slice(&S101Encoder::encode(&frame).unwrap());

        let mut decoder = S101Decoder::new();
        let results = decoder.feed(&stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap(), &frame);
    }

    #[test]
    fn test_oversize_frame_dropped() {
        let big = S101Frame::ember_packet(0, PackageFlags::SINGLE, Dtd::Glow, &[], Bytes::from(vec![0x11; 64]));
        let small = S101Frame::keep_alive_request(0);
        let mut stream = S101Encoder::encode(&big).unwrap().to_vec();
        stream.extend_from_slice(&S101Encoder::encode(&small).unwrap());

        let mut decoder = S101Decoder::with_max_frame_size(32);
        let results = decoder.feed(&stream);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap(), &small);
    }

    #[test]
    fn test_short_frame() {
        let mut decoder = S101Decoder::new();
        let results = decoder.feed(&[BOF, 0x00, 0x0E, EOF]);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_unescaped_invalid_byte() {
        let mut decoder = S101Decoder::new();
        let mut results = decoder.feed(&[BOF, 0x00, 0xF9, 0x01, EOF]);
        assert_eq!(results.len(), 1);
        assert!(results.remove(0).is_err());
        assert!(decoder.is_idle());
    }
}
