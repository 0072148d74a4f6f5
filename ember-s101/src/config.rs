//! Framing settings

use crate::frame::Dtd;
use serde::{Deserialize, Serialize};

/// Default payload bytes carried by one frame
pub const DEFAULT_MAX_PAYLOAD_PER_FRAME: usize = 1024;
/// Upper bound for payload bytes per frame
pub const MAX_PAYLOAD_PER_FRAME: usize = 4096;
/// Unescaped bytes before the payload: slot, message type, command,
/// version, flags, dtd and app bytes count
pub const FRAME_HEADER_LENGTH: usize = 7;
/// Most application bytes a packet can declare
pub const MAX_APP_BYTES: usize = 255;
/// Default limit on the escaped size of a received frame
///
/// Fits the largest frame any sender may emit: a full payload with the
/// maximum number of application bytes, every byte escaped.
pub const DEFAULT_MAX_FRAME_SIZE: usize = escaped_frame_size(MAX_PAYLOAD_PER_FRAME, MAX_APP_BYTES);
/// Default limit on a reassembled message
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
/// Glow DTD version 2.31, minor byte first
pub const DEFAULT_APP_BYTES: [u8; 2] = [0x1F, 0x02];

/// Worst-case escaped size of one EmBER packet frame, BOF and EOF included
pub const fn escaped_frame_size(payload: usize, app_bytes: usize) -> usize {
    2 * (FRAME_HEADER_LENGTH + app_bytes + payload + 2) + 2
}

/// Largest payload whose frame always fits in `max_frame_size`
pub const fn payload_capacity(max_frame_size: usize, app_bytes: usize) -> usize {
    (max_frame_size.saturating_sub(2) / 2).saturating_sub(FRAME_HEADER_LENGTH + app_bytes + 2)
}

/// S101 framing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S101Config {
    /// Slot written into outbound frames
    pub slot: u8,
    pub dtd: Dtd,
    /// Application-defined bytes of every EmBER packet
    pub app_bytes: Vec<u8>,
    /// Payload bytes per frame before a message is split
    pub max_payload_per_frame: usize,
    /// Escaped bytes per received frame before it is dropped
    pub max_frame_size: usize,
    /// Reassembled bytes per message before it is dropped
    pub max_message_size: usize,
}

impl S101Config {
    pub fn new() -> Self {
        Self {
            slot: 0,
            dtd: Dtd::Glow,
            app_bytes: DEFAULT_APP_BYTES.to_vec(),
            max_payload_per_frame: DEFAULT_MAX_PAYLOAD_PER_FRAME,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_slot(mut self, slot: u8) -> Self {
        self.slot = slot;
        self
    }

    /// Set the payload per frame, clamped so one frame fits in `max_frame_size`
    pub fn with_max_payload_per_frame(mut self, max_payload_per_frame: usize) -> Self {
        self.max_payload_per_frame = max_payload_per_frame;
        self.clamp_payload();
        self
    }

    /// Set the receive limit; the payload per frame shrinks to fit if needed
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self.clamp_payload();
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn with_app_bytes(mut self, app_bytes: impl Into<Vec<u8>>) -> Self {
        self.app_bytes = app_bytes.into();
        self.app_bytes.truncate(MAX_APP_BYTES);
        self.clamp_payload();
        self
    }

    /// Payload bytes actually placed in one frame
    pub fn payload_per_frame(&self) -> usize {
        self.max_payload_per_frame.clamp(1, MAX_PAYLOAD_PER_FRAME)
    }

    /// Escaped frame limit for the decoder
    ///
    /// Never smaller than the largest frame this configuration sends.
    pub fn frame_size_limit(&self) -> usize {
        self.max_frame_size
            .max(escaped_frame_size(self.payload_per_frame(), self.app_bytes.len()))
    }

    fn clamp_payload(&mut self) {
        let capacity = payload_capacity(self.max_frame_size, self.app_bytes.len());
        self.max_payload_per_frame = self
            .max_payload_per_frame
            .min(capacity)
            .clamp(1, MAX_PAYLOAD_PER_FRAME);
    }
}

impl Default for S101Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = S101Config::default();
        assert_eq!(config.slot, 0);
        assert_eq!(config.dtd, Dtd::Glow);
        assert_eq!(config.app_bytes, vec![0x1F, 0x02]);
        assert_eq!(config.max_payload_per_frame, 1024);
        assert_eq!(config.max_frame_size, 8722);
        assert_eq!(config.max_message_size, 16 * 1024 * 1024);
    }

    #[test]
    fn test_default_receiver_fits_largest_frame() {
        let largest = escaped_frame_size(MAX_PAYLOAD_PER_FRAME, MAX_APP_BYTES);
        assert!(S101Config::default().max_frame_size >= largest);
        assert!(payload_capacity(DEFAULT_MAX_FRAME_SIZE, MAX_APP_BYTES) >= MAX_PAYLOAD_PER_FRAME);
    }

    #[test]
    fn test_payload_clamped() {
        let config = S101Config::new().with_max_payload_per_frame(100_000);
        assert_eq!(config.max_payload_per_frame, MAX_PAYLOAD_PER_FRAME);

        let config = S101Config::new().with_max_payload_per_frame(0);
        assert_eq!(config.max_payload_per_frame, 1);

        // (100 - 2) / 2 - (7 + 2 + 2) = 38
        let config = S101Config::new()
            .with_max_frame_size(100)
            .with_max_payload_per_frame(4096);
        assert_eq!(config.max_payload_per_frame, 38);
        assert!(escaped_frame_size(38, 2) <= 100);

        let config = S101Config::new().with_max_payload_per_frame(4096).with_max_frame_size(100);
        assert_eq!(config.max_payload_per_frame, 38);
    }

    #[test]
    fn test_frame_size_limit_covers_own_frames() {
        // Fields set directly bypass the builder clamps
        let config = S101Config {
            max_payload_per_frame: 500,
            max_frame_size: 64,
            ..S101Config::default()
        };
        assert_eq!(config.frame_size_limit(), escaped_frame_size(500, 2));
    }

    #[test]
    fn test_serde_round_trip() {
        let config = S101Config::new().with_slot(2).with_max_message_size(1 << 20);
        let json = serde_json::to_string(&config).unwrap();
        let back: S101Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
