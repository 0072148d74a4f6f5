//! BER (Basic Encoding Rules) codec for the Ember+ protocol
//!
//! Each ASN.1 value is encoded as a TLV (Tag-Length-Value) triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! ## Tag Encoding
//!
//! ```text
//! Bits: 8 7 6 5 4 3 2 1
//!       C C P T T T T T
//! ```
//! - CC = Class (00=Universal, 01=Application, 10=Context, 11=Private)
//! - P = Primitive (0) or Container (1)
//! - TTTTT = Tag number (0-30), or 11111 followed by base-128 octets
//!
//! ## Length Encoding
//!
//! - **Short form**: one octet, lengths 0-127
//! - **Long form**: `0x80 | n` followed by `n` big-endian length octets
//! - **Indefinite form**: `0x80`, contents closed by an end-of-contents
//!   marker (`00 00`)
//!
//! ## Explicit tagging
//!
//! Ember+ (Glow) wraps every value in an outer context or application tag:
//! the outer TLV's value is a complete universal TLV. [`BerEncoder::encode_frame`]
//! and the streaming [`reader::AsyncBerReader`] both work on this shape.

pub mod error;
pub mod types;
pub mod sink;
pub mod codec;
pub mod encoder;
pub mod decoder;
pub mod reader;

pub use error::{EmberError, EmberResult};
pub use types::{Length, Tag, TagClass};
pub use sink::{FixedSink, OctetSink};
pub use encoder::BerEncoder;
pub use decoder::BerDecoder;
pub use reader::{AsyncBerReader, EventCollector, ReaderConfig, ReaderEvent, ReaderHandler};
