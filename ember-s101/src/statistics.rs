//! S101 statistics collection

use serde::{Deserialize, Serialize};

/// S101 session counters
///
/// Updated by [`S101Session`](crate::session::S101Session) while frames are
/// encoded and decoded; query them at any time to monitor link health.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S101Statistics {
    /// Total number of frames sent
    pub frames_sent: u64,
    /// Total number of valid frames received
    pub frames_received: u64,
    /// Frames rejected for a CRC mismatch
    pub crc_errors: u64,
    /// Frames rejected for malformed content, unknown commands or size
    pub invalid_frames: u64,
    /// Packets that arrived out of reassembly order
    pub desyncs: u64,
    /// Keep-alive requests answered
    pub keep_alives_answered: u64,
    /// Complete messages handed to the application
    pub messages_delivered: u64,
}

impl S101Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters to zero
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn increment_frames_sent(&mut self) {
        self.frames_sent += 1;
    }

    pub fn increment_frames_received(&mut self) {
        self.frames_received += 1;
    }

    pub fn increment_crc_errors(&mut self) {
        self.crc_errors += 1;
    }

    pub fn increment_invalid_frames(&mut self) {
        self.invalid_frames += 1;
    }

    pub fn increment_desyncs(&mut self) {
        self.desyncs += 1;
    }

    pub fn increment_keep_alives_answered(&mut self) {
        self.keep_alives_answered += 1;
    }

    pub fn increment_messages_delivered(&mut self) {
        self.messages_delivered += 1;
    }

    /// Share of received frames that were rejected, 0.0 to 1.0
    pub fn error_rate(&self) -> f64 {
        let rejected = self.crc_errors + self.invalid_frames;
        let total = self.frames_received + rejected;
        if total == 0 {
            0.0
        } else {
            rejected as f64 / total as f64
        }
    }
}
