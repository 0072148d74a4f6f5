//! Splitting payloads across frames and joining them again

use crate::config::{DEFAULT_MAX_MESSAGE_SIZE, MAX_PAYLOAD_PER_FRAME, S101Config};
use crate::error::{EmberError, EmberResult};
use crate::frame::{Dtd, EmberPacket, PackageFlags, S101Frame};
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;

/// Splits one payload into EmBER packet frames
pub struct Fragmenter;

impl Fragmenter {
    /// Frames carrying `payload`, flagged single or first/middle.../last
    ///
    /// An empty payload is sent as one single packet with the empty flag.
    pub fn fragment(config: &S101Config, payload: Bytes) -> Vec<S101Frame> {
        let frame = |flags: PackageFlags, chunk: Bytes| {
            S101Frame::ember_packet(config.slot, flags, config.dtd, &config.app_bytes, chunk)
        };

        if payload.is_empty() {
            return vec![frame(PackageFlags::SINGLE.union(PackageFlags::EMPTY), payload)];
        }

        let chunk_size = config.max_payload_per_frame.clamp(1, MAX_PAYLOAD_PER_FRAME);
        if payload.len() <= chunk_size {
            return vec![frame(PackageFlags::SINGLE, payload)];
        }

        let count = payload.len().div_ceil(chunk_size);
        let mut frames = Vec::with_capacity(count);
        let mut offset = 0;
        while offset < payload.len() {
            let end = (offset + chunk_size).min(payload.len());
            let flags = if offset == 0 {
                PackageFlags::FIRST
            } else if end == payload.len() {
                PackageFlags::LAST
            } else {
                PackageFlags::MIDDLE
            };
            frames.push(frame(flags, payload.slice(offset..end)));
            offset = end;
        }
        log::debug!(
            "Split {} payload bytes into {} frames on slot {}",
            payload.len(),
            frames.len(),
            config.slot
        );
        frames
    }
}

/// A payload reassembled from one or more packets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassembledMessage {
    pub slot: u8,
    pub dtd: Dtd,
    pub app_bytes: Vec<u8>,
    pub payload: Bytes,
}

#[derive(Debug)]
struct Pending {
    dtd: Dtd,
    app_bytes: Vec<u8>,
    payload: BytesMut,
    packets: usize,
}

/// Per-slot reassembly of multi-packet messages
#[derive(Debug)]
pub struct Reassembler {
    pending: HashMap<u8, Pending>,
    max_message_size: usize,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            pending: HashMap::new(),
            max_message_size,
        }
    }

    fn oversize(&self, slot: u8, size: usize) -> EmberError {
        log::warn!(
            "Dropping message on slot {}: {} bytes exceed maximum of {}",
            slot,
            size,
            self.max_message_size
        );
        EmberError::FramingDesync(format!(
            "Message on slot {} exceeds maximum size of {} bytes",
            slot, self.max_message_size
        ))
    }

    /// Accept one packet received on `slot`
    ///
    /// Returns the complete message once its last packet arrived.
    ///
    /// # Error Handling
    /// A middle or last packet with no reassembly open on its slot returns
    /// `FramingDesync`; the packet is discarded. A message growing past the
    /// maximum message size also returns `FramingDesync` and its reassembly
    /// is dropped.
    pub fn push(&mut self, slot: u8, packet: EmberPacket) -> EmberResult<Option<ReassembledMessage>> {
        let flags = packet.flags;

        if flags.is_first() {
            if let Some(stale) = self.pending.remove(&slot) {
                log::warn!(
                    "Discarding incomplete message on slot {} ({} packets, {} bytes)",
                    slot,
                    stale.packets,
                    stale.payload.len()
                );
            }
            if flags.is_last() {
                return Ok(Some(ReassembledMessage {
                    slot,
                    dtd: packet.dtd,
                    app_bytes: packet.app_bytes,
                    payload: packet.payload,
                }));
            }
            if packet.payload.len() > self.max_message_size {
                return Err(self.oversize(slot, packet.payload.len()));
            }
            log::debug!("Reassembly started on slot {}", slot);
            self.pending.insert(
                slot,
                Pending {
                    dtd: packet.dtd,
                    app_bytes: packet.app_bytes,
                    payload: BytesMut::from(&packet.payload[..]),
                    packets: 1,
                },
            );
            return Ok(None);
        }

        let Some(pending) = self.pending.get_mut(&slot) else {
            return Err(EmberError::FramingDesync(format!(
                "{} packet on slot {} without a first packet",
                flags, slot
            )));
        };
        let size = pending.payload.len() + packet.payload.len();
        if size > self.max_message_size {
            self.pending.remove(&slot);
            return Err(self.oversize(slot, size));
        }
        pending.payload.extend_from_slice(&packet.payload);
        pending.packets += 1;

        if !flags.is_last() {
            return Ok(None);
        }

        match self.pending.remove(&slot) {
            Some(done) => {
                log::debug!(
                    "Reassembled {} bytes from {} packets on slot {}",
                    done.payload.len(),
                    done.packets,
                    slot
                );
                Ok(Some(ReassembledMessage {
                    slot,
                    dtd: done.dtd,
                    app_bytes: done.app_bytes,
                    payload: done.payload.freeze(),
                }))
            }
            None => Ok(None),
        }
    }

    /// Whether a reassembly is open on `slot`
    pub fn is_pending(&self, slot: u8) -> bool {
        self.pending.contains_key(&slot)
    }

    /// Drop all open reassemblies
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
