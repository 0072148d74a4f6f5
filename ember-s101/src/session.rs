//! S101 session: framing, reassembly and keep-alive handling
//!
//! The session is transport-agnostic. Received bytes go in through
//! [`S101Session::feed`]; bytes to send accumulate in an outbound buffer
//! drained with [`S101Session::take_outbound`]. Keep-alive requests are
//! answered during `feed`, whatever state reassembly is in.

use crate::config::S101Config;
use crate::decoder::S101Decoder;
use crate::encoder::S101Encoder;
use crate::error::{EmberError, EmberResult};
use crate::fragment::{Fragmenter, Reassembler};
use crate::frame::{Dtd, S101Frame, S101Message};
use crate::statistics::S101Statistics;
use bytes::{Bytes, BytesMut};

/// Something that happened on the link
#[derive(Debug)]
pub enum SessionEvent {
    /// A complete EmBER message
    Message { slot: u8, dtd: Dtd, payload: Bytes },
    /// The peer answered a keep-alive request
    KeepAliveResponse { slot: u8 },
    ProviderState { slot: u8, state: u8 },
    /// A frame or packet was rejected; later frames are unaffected
    Fault(EmberError),
}

pub struct S101Session {
    config: S101Config,
    decoder: S101Decoder,
    reassembler: Reassembler,
    outbound: BytesMut,
    statistics: S101Statistics,
}

impl S101Session {
    pub fn new(config: S101Config) -> Self {
        Self {
            decoder: S101Decoder::with_max_frame_size(config.frame_size_limit()),
            reassembler: Reassembler::with_max_message_size(config.max_message_size),
            config,
            outbound: BytesMut::new(),
            statistics: S101Statistics::new(),
        }
    }

    pub fn config(&self) -> &S101Config {
        &self.config
    }

    pub fn statistics(&self) -> &S101Statistics {
        &self.statistics
    }

    /// Process received bytes
    ///
    /// A rejected frame may have been part of an open reassembly, so every
    /// open reassembly is dropped with it.
    pub fn feed(&mut self, data: &[u8]) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for result in self.decoder.feed(data) {
            match result {
                Ok(frame) => {
                    self.statistics.increment_frames_received();
                    if let Some(event) = self.handle_frame(frame) {
                        events.push(event);
                    }
                }
                Err(e) => {
                    log::warn!("Rejected S101 frame: {}", e);
                    match e {
                        EmberError::CrcMismatch { .. } => self.statistics.increment_crc_errors(),
                        _ => self.statistics.increment_invalid_frames(),
                    }
                    self.reassembler.clear();
                    events.push(SessionEvent::Fault(e));
                }
            }
        }
        events
    }

    fn handle_frame(&mut self, frame: S101Frame) -> Option<SessionEvent> {
        let slot = frame.slot;
        match frame.message {
            S101Message::KeepAliveRequest => {
                log::debug!("Answering keep-alive on slot {}", slot);
                match self.queue(&S101Frame::keep_alive_response(slot)) {
                    Ok(_) => {
                        self.statistics.increment_keep_alives_answered();
                        None
                    }
                    Err(e) => Some(SessionEvent::Fault(e)),
                }
            }
            S101Message::KeepAliveResponse => Some(SessionEvent::KeepAliveResponse { slot }),
            S101Message::ProviderState(state) => Some(SessionEvent::ProviderState { slot, state }),
            S101Message::EmberPacket(packet) => match self.reassembler.push(slot, packet) {
                Ok(Some(message)) => {
                    self.statistics.increment_messages_delivered();
                    Some(SessionEvent::Message {
                        slot: message.slot,
                        dtd: message.dtd,
                        payload: message.payload,
                    })
                }
                Ok(None) => None,
                Err(e) => {
                    log::warn!("Dropping packet: {}", e);
                    self.statistics.increment_desyncs();
                    Some(SessionEvent::Fault(e))
                }
            },
        }
    }

    fn queue(&mut self, frame: &S101Frame) -> EmberResult<usize> {
        let written = S101Encoder::encode_into(frame, &mut self.outbound)?;
        self.statistics.increment_frames_sent();
        Ok(written)
    }

    /// Frame a payload and queue it for sending
    ///
    /// Returns the number of frames the payload was split into.
    pub fn encode_message(&mut self, payload: impl Into<Bytes>) -> EmberResult<usize> {
        let frames = Fragmenter::fragment(&self.config, payload.into());
        for frame in &frames {
            self.queue(frame)?;
        }
        Ok(frames.len())
    }

    pub fn keep_alive_request(&mut self) -> EmberResult<()> {
        self.queue(&S101Frame::keep_alive_request(self.config.slot))?;
        Ok(())
    }

    pub fn provider_state(&mut self, state: u8) -> EmberResult<()> {
        self.queue(&S101Frame::provider_state(self.config.slot, state))?;
        Ok(())
    }

    /// Whether bytes are waiting to be sent
    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Drain the bytes queued for sending
    pub fn take_outbound(&mut self) -> Bytes {
        self.outbound.split().freeze()
    }

    /// Drop partial frames and open reassemblies
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.reassembler.clear();
    }
}

impl Default for S101Session {
    fn default() -> Self {
        Self::new(S101Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PackageFlags;

    fn encoded(frame: &S101Frame) -> Vec<u8> {
        S101Encoder::encode(frame).unwrap().to_vec()
    }

    #[test]
    fn test_message_round_trip() {
        let mut sender = S101Session::new(S101Config::default().with_max_payload_per_frame(8));
        let payload: Vec<u8> = (0u8..50).collect();
        assert_eq!(sender.encode_message(payload.clone()).unwrap(), 7);
        assert_eq!(sender.statistics().frames_sent, 7);

        let mut receiver = S101Session::default();
        let events = receiver.feed(&sender.take_outbound());
        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::Message { slot, dtd, payload: received } => {
                assert_eq!(*slot, 0);
                assert_eq!(*dtd, Dtd::Glow);
                assert_eq!(&received[..], &payload[..]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(receiver.statistics().messages_delivered, 1);
        assert!(!sender.has_outbound());
    }

    #[test]
    fn test_keep_alive_answered_during_reassembly() {
        let mut session = S101Session::default();
        let first = S101Frame::ember_packet(0, PackageFlags::FIRST, Dtd::Glow, &[], Bytes::from_static(b"ab"));
        let last = S101Frame::ember_packet(0, PackageFlags::LAST, Dtd::Glow, &[], Bytes::from_static(b"cd"));

        assert!(session.feed(&encoded(&first)).is_empty());
        assert!(session.feed(&encoded(&S101Frame::keep_alive_request(0))).is_empty());

        let mut peer = S101Session::default();
        let replies = peer.feed(&session.take_outbound());
        assert!(matches!(replies[..], [SessionEvent::KeepAliveResponse { slot: 0 }]));

        let events = session.feed(&encoded(&last));
        assert!(matches!(&events[..], [SessionEvent::Message { payload, .. }] if &payload[..] == b"abcd"));
        assert_eq!(session.statistics().keep_alives_answered, 1);
    }

    #[test]
    fn test_faults_are_reported() {
        let mut session = S101Session::default();
        let orphan = S101Frame::ember_packet(0, PackageFlags::LAST, Dtd::Glow, &[], Bytes::from_static(b"x"));
        let events = session.feed(&encoded(&orphan));
        assert!(matches!(events[..], [SessionEvent::Fault(EmberError::FramingDesync(_))]));
        assert_eq!(session.statistics().desyncs, 1);

        let mut corrupt = encoded(&S101Frame::keep_alive_request(0));
        corrupt[1] = 0x05;
        let events = session.feed(&corrupt);
        assert!(matches!(events[..], [SessionEvent::Fault(EmberError::CrcMismatch { .. })]));
        assert_eq!(session.statistics().crc_errors, 1);
        assert_eq!(session.statistics().invalid_frames, 0);
        assert!(!session.has_outbound());
    }

    /// Keep-alive request frame with its command byte replaced
    fn unknown_command(command: u8) -> Vec<u8> {
        let mut out = BytesMut::new();
        S101Encoder::write_message(&[0x00, 0x0E, command, 0x01], &mut out);
        out.to_vec()
    }

    #[test]
    fn test_rejected_frames_counted_apart() {
        let mut session = S101Session::default();
        let mut corrupt = encoded(&S101Frame::keep_alive_request(0));
        corrupt[1] ^= 0x01;
        session.feed(&corrupt);
        session.feed(&unknown_command(0x09));
        session.feed(&[0xFE, 0x00, 0x0E, 0xFF]);

        let stats = session.statistics();
        assert_eq!(stats.crc_errors, 1);
        assert_eq!(stats.invalid_frames, 2);
        assert_eq!(stats.frames_received, 0);
    }

    #[test]
    fn test_rejected_frame_drops_reassembly() {
        let first = S101Frame::ember_packet(0, PackageFlags::FIRST, Dtd::Glow, &[], Bytes::from_static(b"AAAA"));
        let middle = S101Frame::ember_packet(0, PackageFlags::MIDDLE, Dtd::Glow, &[], Bytes::from_static(b"BBBB"));
        let last = S101Frame::ember_packet(0, PackageFlags::LAST, Dtd::Glow, &[], Bytes::from_static(b"CCCC"));

        let mut corrupt = encoded(&middle);
        let payload_at = corrupt.len() - 4;
        corrupt[payload_at] ^= 0x01;

        let mut bad_frames = vec![corrupt, unknown_command(0x09)];
        // Escaped size over the limit
        let oversize = S101Frame::ember_packet(0, PackageFlags::MIDDLE, Dtd::Glow, &[], Bytes::from(vec![0xFFu8; 5000]));
        bad_frames.push(encoded(&oversize));

        for bad in bad_frames {
            let mut session = S101Session::default();
            assert!(session.feed(&encoded(&first)).is_empty());
            let events = session.feed(&bad);
            assert!(matches!(events[..], [SessionEvent::Fault(_)]));

            let events = session.feed(&encoded(&last));
            assert!(
                !events.iter().any(|e| matches!(e, SessionEvent::Message { .. })),
                "partial message delivered: {:?}",
                events
            );
            assert!(matches!(events[..], [SessionEvent::Fault(EmberError::FramingDesync(_))]));
            assert_eq!(session.statistics().messages_delivered, 0);
        }
    }

    #[test]
    fn test_large_frames_within_receive_limit() {
        // Builder clamps bypassed; the decoder still accepts this session's frames
        let config = S101Config {
            max_payload_per_frame: 200,
            max_frame_size: 64,
            ..S101Config::default()
        };
        let mut sender = S101Session::new(config.clone());
        sender.encode_message(vec![0xFFu8; 500]).unwrap();
        let mut receiver = S101Session::new(config);
        let events = receiver.feed(&sender.take_outbound());
        assert!(matches!(&events[..], [SessionEvent::Message { payload, .. }] if payload.len() == 500));
    }

    #[test]
    fn test_message_size_limit() {
        let mut sender = S101Session::new(S101Config::default().with_max_payload_per_frame(16));
        sender.encode_message(vec![0x11u8; 64]).unwrap();
        let mut receiver = S101Session::new(S101Config::default().with_max_message_size(40));
        let events = receiver.feed(&sender.take_outbound());
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Message { .. })));
        assert!(matches!(events[0], SessionEvent::Fault(EmberError::FramingDesync(_))));
        assert_eq!(receiver.statistics().messages_delivered, 0);
    }

    #[test]
    fn test_provider_state() {
        let mut sender = S101Session::new(S101Config::default().with_slot(4));
        sender.provider_state(1).unwrap();
        let mut receiver = S101Session::default();
        let events = receiver.feed(&sender.take_outbound());
        assert!(matches!(events[..], [SessionEvent::ProviderState { slot: 4, state: 1 }]));
    }
}
