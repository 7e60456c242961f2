// ABOUTME: SMPP session error types shared by the codec, transport and transceiver task
// ABOUTME: Converts I/O, codec and TLS failures so callers can propagate with `?`

use crate::codec::CodecError;
use crate::datatypes::CommandStatus;
use std::io;
use thiserror::Error;

/// Error type for SMPP session operations
#[derive(Debug, Error)]
pub enum SmppError {
    /// I/O error during network operations (connect, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// Malformed PDU on the wire
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The SMSC answered with a non-zero command_status or a generic_nack
    #[error("Protocol error: {0}")]
    Protocol(CommandStatus),

    /// A message the SMSC would never accept (address or text too long)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Operation timeout")]
    Timeout,

    /// The link dropped while the operation was in flight
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// The session is not bound to the SMSC right now
    #[error("Not bound to SMSC")]
    NotBound,

    /// The session has been closed and accepts no more work
    #[error("Session closed")]
    SessionClosed,

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The SMSC address cannot be used as a TLS server name
    #[error("Invalid SMSC address '{0}'")]
    InvalidAddress(String),
}

/// Result type alias for SMPP operations
pub type SmppResult<T> = Result<T, SmppError>;

impl SmppError {
    /// True for failures caused by the link rather than by the message
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SmppError::Connection(_)
                | SmppError::ConnectionClosed
                | SmppError::NotBound
                | SmppError::SessionClosed
        )
    }
}
