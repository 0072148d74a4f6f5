//! Byte-fed BER reader state machine
//!
//! Every element is read in explicit-tagging shape:
//!
//! ```text
//! Tag -> Length -> TypeTag -> TypeLength -> Value -> (Terminator) -> Tag ...
//! ```
//!
//! A container type tag opens a new stack frame and the reader returns to
//! `Tag` for the container's children. Indefinite lengths are closed by one
//! end-of-contents marker each (inner contents first, then the outer tag);
//! `Terminator` consumes the marker that closes an indefinite outer tag.
//!
//! All positions are absolute offsets since the last reset, so a frame's end
//! does not depend on how the input was chunked.

use super::config::ReaderConfig;
use super::handler::{EventCollector, ReaderEvent, ReaderHandler};
use crate::codec;
use crate::error::{EmberError, EmberResult};
use crate::types::{Length, Tag};

/// Identifier octets for a 32-bit tag number
const MAX_TAG_OCTETS: usize = 6;
/// Long-form length octets accepted by [`Length::decode`]
const MAX_LENGTH_OCTETS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Tag,
    Length,
    TypeTag,
    TypeLength,
    Value,
    Terminator,
}

/// What the pending end-of-contents marker closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminates {
    Item,
    Container,
}

#[derive(Debug, Clone, Copy)]
struct ContainerFrame {
    tag: Tag,
    type_tag: Tag,
    /// Offset where the outer tag's contents end, `None` when indefinite
    outer_end: Option<u64>,
    /// Offset where the children end, `None` when indefinite
    inner_end: Option<u64>,
}

/// Streaming BER reader
///
/// # Cancellation
///
/// Dropping or resetting the reader at any point only discards the open
/// container stack; nothing already reported to the handler is revoked.
#[derive(Debug)]
pub struct AsyncBerReader {
    config: ReaderConfig,
    state: State,
    position: u64,
    stack: Vec<ContainerFrame>,
    scratch: Vec<u8>,
    tag: Tag,
    outer_end: Option<u64>,
    type_tag: Tag,
    value: Vec<u8>,
    value_length: usize,
    terminator_remaining: u8,
    terminates: Terminates,
}

impl AsyncBerReader {
    /// Create a reader with default settings
    pub fn new() -> Self {
        Self::with_config(ReaderConfig::default())
    }

    /// Create a reader with custom settings
    pub fn with_config(config: ReaderConfig) -> Self {
        Self {
            config,
            state: State::Tag,
            position: 0,
            stack: Vec::new(),
            scratch: Vec::with_capacity(MAX_LENGTH_OCTETS + 1),
            tag: Tag::END_OF_CONTENTS,
            outer_end: None,
            type_tag: Tag::END_OF_CONTENTS,
            value: Vec::new(),
            value_length: 0,
            terminator_remaining: 0,
            terminates: Terminates::Item,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Number of currently open containers
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Bytes consumed since the last reset
    pub fn bytes_consumed(&self) -> u64 {
        self.position
    }

    /// Check whether the reader sits between two top-level elements
    pub fn is_idle(&self) -> bool {
        self.state == State::Tag && self.stack.is_empty() && self.scratch.is_empty()
    }

    /// Discard all partial state
    pub fn reset(&mut self) {
        self.state = State::Tag;
        self.position = 0;
        self.stack.clear();
        self.scratch.clear();
        self.value.clear();
        self.value_length = 0;
        self.outer_end = None;
        self.terminator_remaining = 0;
    }

    /// Feed a chunk of bytes
    ///
    /// On error the reader logs the failure, resets itself and returns the
    /// error; the caller decides whether to keep feeding.
    pub fn feed<H: ReaderHandler + ?Sized>(&mut self, data: &[u8], handler: &mut H) -> EmberResult<()> {
        let result = self.feed_bytes(data, handler);
        if let Err(e) = &result {
            log::warn!("BER reader reset at offset {}: {}", self.position, e);
            self.reset();
        }
        result
    }

    /// Feed a chunk of bytes and return the events it completed
    pub fn feed_collect(&mut self, data: &[u8]) -> EmberResult<Vec<ReaderEvent>> {
        let mut collector = EventCollector::new();
        self.feed(data, &mut collector)?;
        Ok(collector.take_events())
    }

    fn feed_bytes<H: ReaderHandler + ?Sized>(&mut self, data: &[u8], handler: &mut H) -> EmberResult<()> {
        let mut i = 0;
        while i < data.len() {
            if self.state == State::Value {
                let needed = self.value_length - self.value.len();
                let take = needed.min(data.len() - i);
                self.value.extend_from_slice(&data[i..i + take]);
                i += take;
                self.position += take as u64;
                if self.value.len() == self.value_length {
                    self.complete_item(handler)?;
                }
                continue;
            }

            if let Some(limit) = self.limit() {
                if self.position >= limit {
                    return Err(EmberError::Asn1Decoding(format!(
                        "Element at offset {} overruns its enclosing container",
                        self.position
                    )));
                }
            }

            let byte = data[i];
            i += 1;
            self.position += 1;
            self.step(byte, handler)?;
        }
        Ok(())
    }

    /// Tightest end offset imposed by the open containers and current item
    fn limit(&self) -> Option<u64> {
        let current = match self.state {
            State::TypeTag | State::TypeLength | State::Value => self.outer_end,
            _ => None,
        };
        self.stack
            .iter()
            .flat_map(|frame| [frame.inner_end, frame.outer_end])
            .chain(std::iter::once(current))
            .flatten()
            .min()
    }

    fn step<H: ReaderHandler + ?Sized>(&mut self, byte: u8, handler: &mut H) -> EmberResult<()> {
        match self.state {
            State::Tag => {
                if let Some(tag) = self.accumulate_tag(byte)? {
                    self.tag = tag;
                    self.state = State::Length;
                }
            }
            State::Length => {
                if let Some(length) = self.accumulate_length(byte)? {
                    self.on_outer_length(length, handler)?;
                }
            }
            State::TypeTag => {
                if let Some(tag) = self.accumulate_tag(byte)? {
                    if tag.is_end_of_contents() {
                        return Err(EmberError::Asn1Decoding(format!(
                            "Missing type tag inside {}",
                            self.tag
                        )));
                    }
                    self.type_tag = tag;
                    self.state = State::TypeLength;
                }
            }
            State::TypeLength => {
                if let Some(length) = self.accumulate_length(byte)? {
                    self.on_inner_length(length, handler)?;
                }
            }
            State::Value => {
                // Value octets are consumed in bulk by `feed_bytes`
                self.value.push(byte);
                if self.value.len() == self.value_length {
                    self.complete_item(handler)?;
                }
            }
            State::Terminator => {
                if byte != 0x00 {
                    return Err(EmberError::Asn1Decoding(format!(
                        "Expected end-of-contents, got 0x{:02X}",
                        byte
                    )));
                }
                self.terminator_remaining -= 1;
                if self.terminator_remaining == 0 {
                    self.state = State::Tag;
                    if self.terminates == Terminates::Container {
                        self.pop_container(handler)?;
                    }
                    self.close_completed(handler)?;
                }
            }
        }
        Ok(())
    }

    fn accumulate_tag(&mut self, byte: u8) -> EmberResult<Option<Tag>> {
        self.scratch.push(byte);
        if self.scratch.len() > MAX_TAG_OCTETS {
            return Err(EmberError::Asn1Decoding(
                "Tag number exceeds 32 bits".to_string(),
            ));
        }
        if !Tag::is_complete(&self.scratch) {
            return Ok(None);
        }
        let (tag, _) = Tag::decode(&self.scratch)?;
        self.scratch.clear();
        Ok(Some(tag))
    }

    fn accumulate_length(&mut self, byte: u8) -> EmberResult<Option<Length>> {
        if self.scratch.is_empty() && byte & 0x80 != 0 && (byte & 0x7F) as usize > MAX_LENGTH_OCTETS {
            return Err(EmberError::Asn1Decoding(format!(
                "Invalid length octet 0x{:02X}",
                byte
            )));
        }
        self.scratch.push(byte);
        if !Length::is_complete(&self.scratch) {
            return Ok(None);
        }
        let (length, _) = Length::decode(&self.scratch)?;
        self.scratch.clear();
        Ok(Some(length))
    }

    fn on_outer_length<H: ReaderHandler + ?Sized>(&mut self, length: Length, handler: &mut H) -> EmberResult<()> {
        if self.tag.is_end_of_contents() {
            if length != Length::Definite(0) {
                return Err(EmberError::Asn1Decoding(
                    "Malformed end-of-contents marker".to_string(),
                ));
            }
            self.state = State::Tag;
            return self.on_end_of_contents(handler);
        }

        if !self.tag.is_container() {
            return Err(EmberError::Asn1Decoding(format!(
                "Explicit tag {} must be constructed",
                self.tag
            )));
        }

        self.outer_end = match length {
            Length::Definite(0) => {
                return Err(EmberError::Asn1Decoding(format!("Empty explicit tag {}", self.tag)));
            }
            Length::Definite(len) => Some(self.position + len as u64),
            Length::Indefinite => None,
        };

        if let (Some(end), Some(limit)) = (self.outer_end, self.limit()) {
            if end > limit {
                return Err(EmberError::Asn1Decoding(format!(
                    "Declared length of {} exceeds its enclosing container",
                    self.tag
                )));
            }
        }

        self.state = State::TypeTag;
        Ok(())
    }

    fn on_inner_length<H: ReaderHandler + ?Sized>(&mut self, length: Length, handler: &mut H) -> EmberResult<()> {
        if self.type_tag.is_container() {
            let inner_end = length.value().map(|len| self.position + len as u64);
            if let (Some(inner), Some(outer)) = (inner_end, self.outer_end) {
                if inner != outer {
                    return Err(EmberError::Asn1Decoding(format!(
                        "Contents of {} do not fill explicit tag {}",
                        self.type_tag, self.tag
                    )));
                }
            }
            if let (Some(inner), Some(limit)) = (inner_end, self.limit()) {
                if inner > limit {
                    return Err(EmberError::Asn1Decoding(format!(
                        "Declared length of {} exceeds its enclosing container",
                        self.type_tag
                    )));
                }
            }

            if self.stack.len() >= self.config.max_depth {
                return Err(EmberError::DepthExceeded {
                    max_depth: self.config.max_depth,
                });
            }

            self.stack.push(ContainerFrame {
                tag: self.tag,
                type_tag: self.type_tag,
                outer_end: self.outer_end,
                inner_end,
            });
            log::debug!("open {} ({}) at depth {}", self.tag, self.type_tag, self.stack.len());
            self.state = State::Tag;
            handler.on_new_container(self.tag, self.type_tag)?;
            return self.close_completed(handler);
        }

        let len = length.value().ok_or_else(|| {
            EmberError::Asn1Decoding(format!("Indefinite length on primitive type {}", self.type_tag))
        })?;
        let value_end = self.position + len as u64;
        if let Some(outer) = self.outer_end {
            if value_end != outer {
                return Err(EmberError::Asn1Decoding(format!(
                    "Value of {} does not fill explicit tag {}",
                    self.type_tag, self.tag
                )));
            }
        }
        if let Some(limit) = self.limit() {
            if value_end > limit {
                return Err(EmberError::Asn1Decoding(format!(
                    "Declared length of {} exceeds its enclosing container",
                    self.type_tag
                )));
            }
        }

        self.value.clear();
        self.value_length = len;
        self.state = State::Value;
        if len == 0 {
            self.complete_item(handler)?;
        }
        Ok(())
    }

    fn complete_item<H: ReaderHandler + ?Sized>(&mut self, handler: &mut H) -> EmberResult<()> {
        let value = codec::decode_value(self.type_tag, &self.value)?;
        self.value.clear();
        handler.on_item_ready(self.tag, value)?;

        if self.outer_end.is_none() {
            self.expect_terminator(Terminates::Item);
            Ok(())
        } else {
            self.state = State::Tag;
            self.close_completed(handler)
        }
    }

    fn expect_terminator(&mut self, terminates: Terminates) {
        self.state = State::Terminator;
        self.terminator_remaining = 2;
        self.terminates = terminates;
    }

    /// End-of-contents read where a child tag was expected
    fn on_end_of_contents<H: ReaderHandler + ?Sized>(&mut self, handler: &mut H) -> EmberResult<()> {
        match self.stack.last() {
            Some(frame) if frame.inner_end.is_none() => {}
            _ => return Err(EmberError::UnexpectedEndOfContents),
        }
        if self.finish_top(handler)? {
            self.close_completed(handler)?;
        }
        Ok(())
    }

    /// Close every container whose definite contents end at the current offset
    fn close_completed<H: ReaderHandler + ?Sized>(&mut self, handler: &mut H) -> EmberResult<()> {
        while let Some(frame) = self.stack.last() {
            if frame.inner_end != Some(self.position) {
                break;
            }
            if !self.finish_top(handler)? {
                break;
            }
        }
        Ok(())
    }

    /// The top container's children are complete
    ///
    /// Returns `false` when an end-of-contents marker for the outer tag is
    /// still pending.
    fn finish_top<H: ReaderHandler + ?Sized>(&mut self, handler: &mut H) -> EmberResult<bool> {
        let Some(frame) = self.stack.last().copied() else {
            return Ok(false);
        };
        match frame.outer_end {
            None => {
                // Children are done; only the outer end-of-contents may follow
                if let Some(top) = self.stack.last_mut() {
                    top.inner_end = None;
                }
                self.expect_terminator(Terminates::Container);
                Ok(false)
            }
            Some(end) if end != self.position => Err(EmberError::Asn1Decoding(format!(
                "Contents of {} do not fill explicit tag {}",
                frame.type_tag, frame.tag
            ))),
            Some(_) => {
                self.pop_container(handler)?;
                Ok(true)
            }
        }
    }

    fn pop_container<H: ReaderHandler + ?Sized>(&mut self, handler: &mut H) -> EmberResult<()> {
        if let Some(frame) = self.stack.pop() {
            log::debug!("close {} ({}) at depth {}", frame.tag, frame.type_tag, self.stack.len());
            self.state = State::Tag;
            handler.on_container_ready(frame.tag, frame.type_tag)?;
        }
        Ok(())
    }
}

impl Default for AsyncBerReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::BerEncoder;
    use ember_core::Value;

    fn item(tag: Tag, value: Value) -> Vec<u8> {
        let mut encoder = BerEncoder::new();
        encoder.encode_frame(tag, &value).unwrap();
        encoder.into_bytes()
    }

    fn container(tag: Tag, type_tag: Tag, children: &[u8]) -> Vec<u8> {
        let mut inner = BerEncoder::new();
        inner.encode_tlv(type_tag, children).unwrap();
        let mut outer = BerEncoder::new();
        outer.encode_tlv(tag.to_container(), inner.as_bytes()).unwrap();
        outer.into_bytes()
    }

    fn parameter_document() -> Vec<u8> {
        let mut contents = item(Tag::context(true, 0), Value::from("gain"));
        contents.extend(item(Tag::context(true, 2), Value::Integer(42)));
        let mut parameter = item(Tag::context(true, 0), Value::Integer(1));
        parameter.extend(container(Tag::context(true, 1), Tag::SET, &contents));
        let element = container(Tag::context(true, 0), Tag::application(true, 1), &parameter);
        container(Tag::application(true, 0), Tag::application(true, 11), &element)
    }

    fn nested(depth: usize) -> Vec<u8> {
        let mut doc = item(Tag::context(true, 0), Value::Null);
        for _ in 0..depth {
            doc = container(Tag::context(true, 0), Tag::SEQUENCE, &doc);
        }
        doc
    }

    #[test]
    fn test_single_item() {
        let mut reader = AsyncBerReader::new();
        let events = reader.feed_collect(&[0xA0, 0x03, 0x02, 0x01, 0x2A]).unwrap();
        assert_eq!(
            events,
            vec![ReaderEvent::ItemReady {
                tag: Tag::context(true, 0),
                value: Value::Integer(42)
            }]
        );
        assert!(reader.is_idle());
    }

    #[test]
    fn test_parameter_document_events() {
        let mut reader = AsyncBerReader::new();
        let events = reader.feed_collect(&parameter_document()).unwrap();
        assert_eq!(events.len(), 9);
        assert_eq!(
            events[0],
            ReaderEvent::NewContainer {
                tag: Tag::application(true, 0),
                type_tag: Tag::application(true, 11)
            }
        );
        assert_eq!(
            events[5],
            ReaderEvent::ItemReady {
                tag: Tag::context(true, 2),
                value: Value::Integer(42)
            }
        );
        assert!(matches!(events[8], ReaderEvent::ContainerReady { .. }));
        assert!(reader.is_idle());
    }

    #[test]
    fn test_chunking_invariance() {
        let document = parameter_document();
        let whole = AsyncBerReader::new().feed_collect(&document).unwrap();

        for chunk_size in 1..=document.len() {
            let mut reader = AsyncBerReader::new();
            let mut events = Vec::new();
            for chunk in document.chunks(chunk_size) {
                events.extend(reader.feed_collect(chunk).unwrap());
            }
            assert_eq!(events, whole, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_indefinite_container() {
        // [0] SET (indefinite) { [0] INTEGER 5 } EOC EOC
        let data = [
            0xA0, 0x80, 0x31, 0x80, 0xA0, 0x03, 0x02, 0x01, 0x05, 0x00, 0x00, 0x00, 0x00,
        ];
        // Indefinite outer tag around definite contents
        let outer_only = [0xA0, 0x80, 0x31, 0x05, 0xA0, 0x03, 0x02, 0x01, 0x05, 0x00, 0x00];
        // Definite outer tag around indefinite contents
        let inner_only = [0xA0, 0x09, 0x31, 0x80, 0xA0, 0x03, 0x02, 0x01, 0x05, 0x00, 0x00];
        let expected = vec![
            ReaderEvent::NewContainer {
                tag: Tag::context(true, 0),
                type_tag: Tag::SET,
            },
            ReaderEvent::ItemReady {
                tag: Tag::context(true, 0),
                value: Value::Integer(5),
            },
            ReaderEvent::ContainerReady {
                tag: Tag::context(true, 0),
                type_tag: Tag::SET,
            },
        ];

        for input in [&data[..], &outer_only[..], &inner_only[..]] {
            for chunk_size in 1..=input.len() {
                let mut reader = AsyncBerReader::new();
                let mut events = Vec::new();
                for chunk in input.chunks(chunk_size) {
                    events.extend(reader.feed_collect(chunk).unwrap());
                }
                assert_eq!(events, expected, "input {:02X?}", input);
                assert!(reader.is_idle());
            }
        }
    }

    #[test]
    fn test_mixed_lengths_nested() {
        // [1] (indefinite) SEQUENCE { [0] SET { [2] INTEGER 1 } }, all inner ends coincide
        let data = [
            0xA1, 0x80, 0x30, 0x09, 0xA0, 0x07, 0x31, 0x05, 0xA2, 0x03, 0x02, 0x01, 0x01, 0x00, 0x00,
        ];
        let mut reader = AsyncBerReader::new();
        let events = reader.feed_collect(&data).unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[4],
            ReaderEvent::ContainerReady {
                tag: Tag::context(true, 1),
                type_tag: Tag::SEQUENCE,
            }
        );
        assert!(reader.is_idle());
    }

    #[test]
    fn test_indefinite_item() {
        let data = [0xA3, 0x80, 0x02, 0x01, 0x07, 0x00, 0x00];
        let mut reader = AsyncBerReader::new();
        let events = reader.feed_collect(&data).unwrap();
        assert_eq!(
            events,
            vec![ReaderEvent::ItemReady {
                tag: Tag::context(true, 3),
                value: Value::Integer(7)
            }]
        );
        assert!(reader.is_idle());
    }

    #[test]
    fn test_empty_container() {
        let data = container(Tag::context(true, 2), Tag::application(true, 4), &[]);
        let events = AsyncBerReader::new().feed_collect(&data).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_depth_bound() {
        let mut reader = AsyncBerReader::with_config(ReaderConfig::with_max_depth(4));
        assert!(reader.feed_collect(&nested(4)).is_ok());

        let err = reader.feed_collect(&nested(5)).unwrap_err();
        assert!(matches!(err, EmberError::DepthExceeded { max_depth: 4 }));
        assert!(reader.is_idle());
    }

    #[test]
    fn test_end_of_contents_in_definite_context() {
        let data = [0xA0, 0x04, 0x30, 0x02, 0x00, 0x00];
        let err = AsyncBerReader::new().feed_collect(&data).unwrap_err();
        assert!(matches!(err, EmberError::UnexpectedEndOfContents));

        let err = AsyncBerReader::new().feed_collect(&[0x00, 0x00]).unwrap_err();
        assert!(matches!(err, EmberError::UnexpectedEndOfContents));
    }

    #[test]
    fn test_length_exceeds_container() {
        // Child declares 5 bytes inside a container with 4 bytes of contents
        let data = [0xA0, 0x06, 0x30, 0x04, 0xA0, 0x05, 0x02, 0x01, 0x01];
        let err = AsyncBerReader::new().feed_collect(&data).unwrap_err();
        assert!(matches!(err, EmberError::Asn1Decoding(_)));
    }

    #[test]
    fn test_inner_does_not_fill_outer() {
        let data = [0xA0, 0x04, 0x02, 0x01, 0x01, 0x00];
        let err = AsyncBerReader::new().feed_collect(&data).unwrap_err();
        assert!(matches!(err, EmberError::Asn1Decoding(_)));
    }

    #[test]
    fn test_recovers_after_error() {
        let mut reader = AsyncBerReader::new();
        assert!(reader.feed_collect(&[0xA0, 0x03, 0x02, 0x02]).is_err());
        assert!(reader.is_idle());
        let events = reader.feed_collect(&[0xA0, 0x03, 0x02, 0x01, 0x2A]).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_partial_feed_keeps_state() {
        let document = parameter_document();
        let mut reader = AsyncBerReader::new();
        let events = reader.feed_collect(&document[..10]).unwrap();
        assert!(!reader.is_idle());
        assert!(reader.depth() > 0);
        assert!(events.len() < 9);
        assert_eq!(reader.bytes_consumed(), 10);
    }
}
