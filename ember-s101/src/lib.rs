//! S101 framing for Ember+
//!
//! S101 delimits BER documents on a byte stream. Every frame starts with
//! BOF (0xFE) and ends with EOF (0xFF); bytes from 0xF8 upwards inside a
//! frame are escaped, and a CRC-CCITT protects the content. Large documents
//! are split over several EmBER packets flagged first/middle/last, and
//! keep-alive and provider state commands share the stream with them.
//!
//! # Layers
//! - [`S101Encoder`] / [`S101Decoder`]: frame ↔ escaped bytes
//! - [`Fragmenter`] / [`Reassembler`]: payload ↔ packets
//! - [`S101Session`]: both plus keep-alive answering, transport-agnostic
//! - `S101Connection` (feature `tokio`): a session over an async stream

pub mod error;
pub mod crc;
pub mod frame;
pub mod config;
pub mod encoder;
pub mod decoder;
pub mod fragment;
pub mod statistics;
pub mod session;
#[cfg(feature = "tokio")]
pub mod connection;

pub use error::{EmberError, EmberResult};
pub use config::S101Config;
pub use frame::{Dtd, EmberPacket, PackageFlags, S101Command, S101Frame, S101Message};
pub use encoder::S101Encoder;
pub use decoder::S101Decoder;
pub use fragment::{Fragmenter, ReassembledMessage, Reassembler};
pub use statistics::S101Statistics;
pub use session::{S101Session, SessionEvent};
#[cfg(feature = "tokio")]
pub use connection::S101Connection;
