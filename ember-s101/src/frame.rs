//! S101 message layout
//!
//! Unescaped message, as covered by the CRC:
//!
//! ```text
//! +------+----------+---------+---------+----------------------------+
//! | slot | msg type | command | version | command specific ...       |
//! +------+----------+---------+---------+----------------------------+
//!
//! EmBER packet:
//!   flags | dtd | app bytes count | app bytes ... | payload ...
//! Provider state:
//!   state
//! ```

use crate::error::{EmberError, EmberResult};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Begin of frame
pub const BOF: u8 = 0xFE;
/// End of frame
pub const EOF: u8 = 0xFF;
/// Escape marker
pub const CE: u8 = 0xFD;
/// Value XORed into an escaped byte
pub const XOR: u8 = 0x20;
/// Bytes at or above this value are escaped inside a frame
pub const INVALID: u8 = 0xF8;

/// Message type of every Ember+ message
pub const MESSAGE_TYPE_EMBER: u8 = 0x0E;
/// Protocol version written by this implementation
pub const VERSION: u8 = 0x01;

/// S101 command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum S101Command {
    EmberPacket = 0x00,
    KeepAliveRequest = 0x01,
    KeepAliveResponse = 0x02,
    ProviderState = 0x03,
}

impl S101Command {
    pub fn from_byte(byte: u8) -> EmberResult<Self> {
        match byte {
            0x00 => Ok(S101Command::EmberPacket),
            0x01 => Ok(S101Command::KeepAliveRequest),
            0x02 => Ok(S101Command::KeepAliveResponse),
            0x03 => Ok(S101Command::ProviderState),
            other => Err(EmberError::UnknownCommand(other)),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Package flags of an EmBER packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PackageFlags(u8);

impl PackageFlags {
    pub const MIDDLE: PackageFlags = PackageFlags(0x00);
    pub const EMPTY: PackageFlags = PackageFlags(0x20);
    pub const LAST: PackageFlags = PackageFlags(0x40);
    pub const FIRST: PackageFlags = PackageFlags(0x80);
    pub const SINGLE: PackageFlags = PackageFlags(0xC0);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_first(&self) -> bool {
        self.0 & Self::FIRST.0 != 0
    }

    pub fn is_last(&self) -> bool {
        self.0 & Self::LAST.0 != 0
    }

    pub fn is_single(&self) -> bool {
        self.is_first() && self.is_last()
    }

    pub fn is_empty(&self) -> bool {
        self.0 & Self::EMPTY.0 != 0
    }

    pub fn union(self, other: PackageFlags) -> Self {
        Self(self.0 | other.0)
    }
}

impl fmt::Display for PackageFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let position = match (self.is_first(), self.is_last()) {
            (true, true) => "single",
            (true, false) => "first",
            (false, true) => "last",
            (false, false) => "middle",
        };
        if self.is_empty() {
            write!(f, "{} (empty)", position)
        } else {
            f.write_str(position)
        }
    }
}

/// Descriptor of the payload format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dtd {
    /// Glow over BER
    #[default]
    Glow,
    Other(u8),
}

impl Dtd {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Dtd::Glow,
            other => Dtd::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Dtd::Glow => 0x01,
            Dtd::Other(byte) => byte,
        }
    }
}

/// Body of an EmBER packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmberPacket {
    pub flags: PackageFlags,
    pub dtd: Dtd,
    pub app_bytes: Vec<u8>,
    pub payload: Bytes,
}

/// Command-specific part of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S101Message {
    EmberPacket(EmberPacket),
    KeepAliveRequest,
    KeepAliveResponse,
    ProviderState(u8),
}

impl S101Message {
    pub fn command(&self) -> S101Command {
        match self {
            S101Message::EmberPacket(_) => S101Command::EmberPacket,
            S101Message::KeepAliveRequest => S101Command::KeepAliveRequest,
            S101Message::KeepAliveResponse => S101Command::KeepAliveResponse,
            S101Message::ProviderState(_) => S101Command::ProviderState,
        }
    }
}

/// One S101 frame, before escaping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S101Frame {
    pub slot: u8,
    pub message_type: u8,
    pub version: u8,
    pub message: S101Message,
}

impl S101Frame {
    /// Create a frame with the Ember+ message type and current version
    pub fn new(slot: u8, message: S101Message) -> Self {
        Self {
            slot,
            message_type: MESSAGE_TYPE_EMBER,
            version: VERSION,
            message,
        }
    }

    /// Create an EmBER packet frame
    pub fn ember_packet(slot: u8, flags: PackageFlags, dtd: Dtd, app_bytes: &[u8], payload: Bytes) -> Self {
        Self::new(
            slot,
            S101Message::EmberPacket(EmberPacket {
                flags,
                dtd,
                app_bytes: app_bytes.to_vec(),
                payload,
            }),
        )
    }

    pub fn keep_alive_request(slot: u8) -> Self {
        Self::new(slot, S101Message::KeepAliveRequest)
    }

    pub fn keep_alive_response(slot: u8) -> Self {
        Self::new(slot, S101Message::KeepAliveResponse)
    }

    pub fn provider_state(slot: u8, state: u8) -> Self {
        Self::new(slot, S101Message::ProviderState(state))
    }

    pub fn command(&self) -> S101Command {
        self.message.command()
    }

    /// The EmBER packet carried by this frame, if any
    pub fn packet(&self) -> Option<&EmberPacket> {
        match &self.message {
            S101Message::EmberPacket(packet) => Some(packet),
            _ => None,
        }
    }

    /// Unescaped message bytes without CRC
    ///
    /// # Error Handling
    /// Returns `InvalidData` if more than 255 application bytes are given.
    pub fn encode(&self) -> EmberResult<Vec<u8>> {
        let mut result = vec![self.slot, self.message_type, self.command().to_byte(), self.version];
        match &self.message {
            S101Message::EmberPacket(packet) => {
                let count = u8::try_from(packet.app_bytes.len()).map_err(|_| {
                    EmberError::InvalidData(format!(
                        "Too many application bytes: {}",
                        packet.app_bytes.len()
                    ))
                })?;
                result.reserve(3 + packet.app_bytes.len() + packet.payload.len());
                result.push(packet.flags.bits());
                result.push(packet.dtd.to_byte());
                result.push(count);
                result.extend_from_slice(&packet.app_bytes);
                result.extend_from_slice(&packet.payload);
            }
            S101Message::ProviderState(state) => result.push(*state),
            S101Message::KeepAliveRequest | S101Message::KeepAliveResponse => {}
        }
        Ok(result)
    }

    /// Parse unescaped message bytes (CRC already removed)
    pub fn decode(data: &[u8]) -> EmberResult<Self> {
        let [slot, message_type, command, version, body @ ..] = data else {
            return Err(EmberError::FrameInvalid(format!(
                "Message too short: {} bytes",
                data.len()
            )));
        };
        if *message_type != MESSAGE_TYPE_EMBER {
            return Err(EmberError::FrameInvalid(format!(
                "Unknown message type 0x{:02X}",
                message_type
            )));
        }

        let message = match S101Command::from_byte(*command)? {
            S101Command::EmberPacket => {
                let [flags, dtd, count, rest @ ..] = body else {
                    return Err(EmberError::FrameInvalid("Truncated EmBER packet header".to_string()));
                };
                let count = *count as usize;
                if rest.len() < count {
                    return Err(EmberError::FrameInvalid(format!(
                        "Application bytes exceed packet: {} declared, {} available",
                        count,
                        rest.len()
                    )));
                }
                S101Message::EmberPacket(EmberPacket {
                    flags: PackageFlags::from_bits(*flags),
                    dtd: Dtd::from_byte(*dtd),
                    app_bytes: rest[..count].to_vec(),
                    payload: Bytes::copy_from_slice(&rest[count..]),
                })
            }
            S101Command::KeepAliveRequest => S101Message::KeepAliveRequest,
            S101Command::KeepAliveResponse => S101Message::KeepAliveResponse,
            S101Command::ProviderState => {
                let state = body.first().ok_or_else(|| {
                    EmberError::FrameInvalid("Provider state without state byte".to_string())
                })?;
                S101Message::ProviderState(*state)
            }
        };

        Ok(Self {
            slot: *slot,
            message_type: *message_type,
            version: *version,
            message,
        })
    }
}

impl fmt::Display for S101Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            S101Message::EmberPacket(packet) => write!(
                f,
                "S101[slot={}, EmBER {}, {} bytes]",
                self.slot,
                packet.flags,
                packet.payload.len()
            ),
            S101Message::ProviderState(state) => {
                write!(f, "S101[slot={}, ProviderState {}]", self.slot, state)
            }
            other => write!(f, "S101[slot={}, {:?}]", self.slot, other.command()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_alive_layout() {
        let frame = S101Frame::keep_alive_request(0);
        assert_eq!(frame.encode().unwrap(), vec![0x00, 0x0E, 0x01, 0x01]);
        assert_eq!(S101Frame::decode(&[0x00, 0x0E, 0x02, 0x01]).unwrap().command(), S101Command::KeepAliveResponse);
    }

    #[test]
    fn test_ember_packet_layout() {
        let frame = S101Frame::ember_packet(
            0,
            PackageFlags::SINGLE,
            Dtd::Glow,
            &[0x1F, 0x02],
            Bytes::from_static(&[0x60, 0x00]),
        );
        let bytes = frame.encode().unwrap();
        assert_eq!(
            bytes,
            vec![0x00, 0x0E, 0x00, 0x01, 0xC0, 0x01, 0x02, 0x1F, 0x02, 0x60, 0x00]
        );
        assert_eq!(S101Frame::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_provider_state() {
        let frame = S101Frame::provider_state(3, 1);
        let bytes = frame.encode().unwrap();
        assert_eq!(bytes, vec![0x03, 0x0E, 0x03, 0x01, 0x01]);
        assert_eq!(S101Frame::decode(&bytes).unwrap(), frame);
        assert!(S101Frame::decode(&bytes[..4]).is_err());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            S101Frame::decode(&[0x00, 0x0E, 0x07, 0x01]),
            Err(EmberError::UnknownCommand(0x07))
        ));
        assert!(matches!(S101Frame::decode(&[0x00, 0x0F, 0x01, 0x01]), Err(EmberError::FrameInvalid(_))));
        assert!(S101Frame::decode(&[0x00, 0x0E]).is_err());
        // App bytes count beyond the packet
        assert!(S101Frame::decode(&[0x00, 0x0E, 0x00, 0x01, 0xC0, 0x01, 0x05, 0x1F]).is_err());
    }

    #[test]
    fn test_flags() {
        assert!(PackageFlags::SINGLE.is_single());
        assert!(PackageFlags::FIRST.is_first() && !PackageFlags::FIRST.is_last());
        assert!(!PackageFlags::MIDDLE.is_first() && !PackageFlags::MIDDLE.is_last());
        let empty = PackageFlags::SINGLE.union(PackageFlags::EMPTY);
        assert!(empty.is_empty() && empty.is_single());
        assert_eq!(empty.to_string(), "single (empty)");
    }
}
