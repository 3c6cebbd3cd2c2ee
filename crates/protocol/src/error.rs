//! Protocol error types

use thiserror::Error;

/// Reasons a byte-stuffed frame could not be recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FramingError {
    /// No END delimiter followed the frame content
    #[error("missing frame terminator")]
    MissingTerminator,

    /// ESC followed by a byte other than ESC_END or ESC_ESC
    #[error("invalid escape sequence 0xDB 0x{0:02X}")]
    InvalidEscape(u8),

    /// ESC was the last byte before the terminator
    #[error("dangling escape at end of frame")]
    DanglingEscape,

    /// Encoded frame exceeds what the gateway can ever send
    #[error("frame exceeds {max} bytes")]
    Oversized { max: usize },
}

/// Reasons a decoded frame does not carry a valid command envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Buffer shorter than header plus checksum
    #[error("envelope truncated: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// First byte is not the KLF protocol id
    #[error("unexpected protocol id 0x{0:02X}")]
    ProtocolId(u8),

    /// Length byte disagrees with the buffer size
    #[error("length byte says {declared}, frame carries {actual}")]
    Length { declared: usize, actual: usize },

    /// XOR checksum mismatch
    #[error("checksum mismatch: expected 0x{expected:02X}, computed 0x{computed:02X}")]
    Checksum { expected: u8, computed: u8 },
}

/// A payload too short for the record it should carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{record} needs {needed} bytes, payload has {available}")]
pub struct RecordError {
    pub record: &'static str,
    pub needed: usize,
    pub available: usize,
}

impl RecordError {
    /// Fail unless `payload` holds at least `needed` bytes
    pub fn check(record: &'static str, payload: &[u8], needed: usize) -> std::result::Result<(), Self> {
        if payload.len() < needed {
            return Err(Self {
                record,
                needed,
                available: payload.len(),
            });
        }
        Ok(())
    }
}

/// Protocol-level errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Malformed byte-stuffed input
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// Malformed command envelope
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Payload shorter than the record it should carry
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Payload does not fit into a single frame
    #[error("Payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// I/O error during frame operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
