//! Trees over S101: framing plus streaming tree decode

use bytes::Bytes;
use ember_ber::ReaderConfig;
use ember_core::{EmberError, EmberResult};
use ember_dom::{DecodedTree, DomReader, NodeId, Tree};
use ember_glow::glow_registry;
use ember_s101::{Dtd, S101Config, S101Session, S101Statistics, SessionEvent};

/// Glow document pipeline for one byte stream
///
/// Received bytes are unframed by an [`S101Session`] and every complete
/// message is decoded into a tree. Keep-alive requests are answered into
/// the outbound buffer; collect those bytes with [`EmberStream::take_outbound`].
pub struct EmberStream {
    session: S101Session,
    reader: DomReader,
}

impl EmberStream {
    pub fn new(config: S101Config) -> Self {
        Self::with_reader_config(config, ReaderConfig::default())
    }

    pub fn with_reader_config(config: S101Config, reader_config: ReaderConfig) -> Self {
        Self {
            session: S101Session::new(config),
            reader: DomReader::with_config(glow_registry(), reader_config),
        }
    }

    pub fn session(&self) -> &S101Session {
        &self.session
    }

    pub fn statistics(&self) -> &S101Statistics {
        self.session.statistics()
    }

    /// Process received bytes
    ///
    /// # Returns
    /// One entry per decoded document or rejected frame/message, in stream
    /// order.
    ///
    /// # Error Handling
    /// A message that fails to decode resets the tree reader; framing keeps
    /// running and later messages decode normally.
    pub fn feed(&mut self, data: &[u8]) -> Vec<EmberResult<DecodedTree>> {
        let mut results = Vec::new();
        for event in self.session.feed(data) {
            match event {
                SessionEvent::Message { slot, dtd, payload } => {
                    if dtd != Dtd::Glow {
                        log::debug!("Ignoring message with DTD {:?} on slot {}", dtd, slot);
                        continue;
                    }
                    self.decode_message(&payload, &mut results);
                }
                SessionEvent::KeepAliveResponse { slot } => {
                    log::trace!("Keep-alive response on slot {}", slot);
                }
                SessionEvent::ProviderState { slot, state } => {
                    log::debug!("Provider state {} on slot {}", state, slot);
                }
                SessionEvent::Fault(e) => results.push(Err(e)),
            }
        }
        results
    }

    fn decode_message(&mut self, payload: &[u8], results: &mut Vec<EmberResult<DecodedTree>>) {
        if let Err(e) = self.reader.feed(payload) {
            log::warn!("Discarding undecodable message: {}", e);
            results.push(Err(e));
            return;
        }
        while let Some(decoded) = self.reader.detach_root() {
            results.push(Ok(decoded));
        }
        if !self.reader.is_idle() {
            self.reader.reset();
            results.push(Err(EmberError::Asn1Decoding(
                "Message ends inside an element".to_string(),
            )));
        }
    }

    /// Encode a tree and queue it for sending
    ///
    /// # Returns
    /// Returns every queued outbound byte, including pending keep-alive
    /// answers.
    pub fn encode_tree(&mut self, tree: &mut Tree, root: NodeId) -> EmberResult<Bytes> {
        let payload = tree.encode_to_vec(root)?;
        let frames = self.session.encode_message(payload)?;
        log::debug!("Queued tree {} in {} frames", root, frames);
        Ok(self.session.take_outbound())
    }

    pub fn keep_alive_request(&mut self) -> EmberResult<Bytes> {
        self.session.keep_alive_request()?;
        Ok(self.session.take_outbound())
    }

    /// Drain queued outbound bytes
    pub fn take_outbound(&mut self) -> Bytes {
        self.session.take_outbound()
    }

    /// Drop partial frames, reassemblies and trees
    pub fn reset(&mut self) {
        self.session.reset();
        self.reader.reset();
    }
}

impl Default for EmberStream {
    fn default() -> Self {
        Self::new(S101Config::default())
    }
}
