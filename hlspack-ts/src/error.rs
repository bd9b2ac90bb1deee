//! Error types for the TS writer.

use thiserror::Error;

/// Errors produced by the transport-stream layer.
#[derive(Error, Debug)]
pub enum TsError {
    /// Packet data shorter than expected.
    #[error("TS packet too short: {0} bytes")]
    PacketTooShort(usize),

    /// Sync byte mismatch.
    #[error("Invalid sync byte: 0x{0:02X}")]
    InvalidSyncByte(u8),

    /// Invalid PES structure.
    #[error("Invalid PES packet: {0}")]
    InvalidPes(String),

    /// Invalid PSI section.
    #[error("Invalid PSI section: {0}")]
    InvalidPsi(String),

    /// Invalid adaptation field.
    #[error("Invalid adaptation field: {0}")]
    InvalidAdaptationField(String),

    /// Buffer too small for the requested write.
    #[error("Buffer overflow: {0}")]
    BufferOverflow(String),

    /// Stream index not registered with the writer.
    #[error("Stream {0} not found")]
    StreamNotFound(usize),

    /// Elementary-stream adaptation failure.
    #[error("Payload adaptation error: {0}")]
    Adaptation(String),

    /// I/O error from the byte sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TsError {
    pub(crate) fn invalid_pes(msg: impl Into<String>) -> Self {
        TsError::InvalidPes(msg.into())
    }

    pub(crate) fn invalid_psi(msg: impl Into<String>) -> Self {
        TsError::InvalidPsi(msg.into())
    }
}

/// Result type alias for the TS layer.
pub type Result<T> = std::result::Result<T, TsError>;
