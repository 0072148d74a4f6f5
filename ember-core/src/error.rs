use thiserror::Error;

/// Main error type for Ember+ operations
#[derive(Error, Debug)]
pub enum EmberError {
    #[error("Connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("ASN.1 encoding error: {0}")]
    Asn1Encoding(String),

    #[error("ASN.1 decoding error: {0}")]
    Asn1Decoding(String),

    #[error("Container nesting exceeds maximum depth of {max_depth}")]
    DepthExceeded { max_depth: usize },

    #[error("End-of-contents marker in definite-length context")]
    UnexpectedEndOfContents,

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Ownership violation: {0}")]
    Ownership(String),

    #[error("Buffer overrun: need {needed} bytes, {available} available")]
    BufferOverrun { needed: usize, available: usize },

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    #[error("CRC has wrong value: 0x{actual:04X}, expected 0x{expected:04X}")]
    CrcMismatch { actual: u16, expected: u16 },

    #[error("Framing desync: {0}")]
    FramingDesync(String),

    #[error("Unknown S101 command: 0x{0:02X}")]
    UnknownCommand(u8),
}

impl EmberError {
    /// Check whether the error was caused by malformed input bytes
    ///
    /// Malformed input is recoverable: the decoder that produced it has
    /// already reset itself, and the caller decides whether to keep the
    /// connection.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            EmberError::Asn1Decoding(_)
                | EmberError::DepthExceeded { .. }
                | EmberError::UnexpectedEndOfContents
                | EmberError::UnsupportedType(_)
                | EmberError::FrameInvalid(_)
                | EmberError::CrcMismatch { .. }
                | EmberError::FramingDesync(_)
                | EmberError::UnknownCommand(_)
        )
    }
}

/// Result type alias for Ember+ operations
pub type EmberResult<T> = Result<T, EmberError>;
