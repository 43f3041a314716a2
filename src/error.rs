//! Error handling.

use std::{result, str};

use thiserror::Error;

use crate::protocol::frame::coding::{CloseCode, Data};

/// Result type of all receiver calls.
pub type Result<T, E = Error> = result::Result<T, E>;

/// Possible receiver errors.
///
/// Every variant is fatal to the receiver that produced it. Use [`Error::close_code`] to
/// pick the status code of the close frame the transport should answer with.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// Protocol violation.
    #[error("WebSocket protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// UTF-8 coding error in a text message or a close reason.
    #[error("Invalid UTF-8 sequence")]
    Utf8,
    /// Message or frame is bigger than the receiver accepts.
    #[error("Space limit exceeded: {0}")]
    Capacity(#[from] CapacityError),
    /// The decompression extension failed to inflate a payload.
    #[error("Inflate error: {0}")]
    Inflate(#[from] InflateError),
    /// Invalid extension configuration.
    #[error("Extension error: {0}")]
    Extension(#[from] ExtensionError),
}

impl Error {
    /// The close code a peer should be sent for this error.
    pub fn close_code(&self) -> CloseCode {
        match self {
            Error::Protocol(_) => CloseCode::Protocol,
            Error::Utf8 => CloseCode::Invalid,
            Error::Capacity(_) => CloseCode::Size,
            Error::Inflate(InflateError::InvalidData(_)) => CloseCode::Invalid,
            Error::Inflate(_) => CloseCode::Size,
            Error::Extension(_) => CloseCode::Extension,
        }
    }
}

impl From<str::Utf8Error> for Error {
    fn from(_: str::Utf8Error) -> Self {
        Error::Utf8
    }
}

/// Indicates the specific type/cause of a capacity error.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum CapacityError {
    /// Message is bigger than the maximum allowed size.
    #[error("Max payload size exceeded: {size} > {max_size}")]
    MessageTooLong {
        /// The size of the message.
        size: u64,
        /// The maximum allowed message size.
        max_size: usize,
    },
    /// Frame payload length cannot be represented exactly.
    #[error("Unsupported WebSocket frame: payload length {0} > 2^53 - 1")]
    UnsupportedPayloadLength(u64),
}

/// Indicates the specific type/cause of a protocol error.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProtocolError {
    /// RSV2 or RSV3 are non-zero, no extension defines them.
    #[error("RSV2 and RSV3 must be clear")]
    NonZeroReservedBits,
    /// RSV1 is set on a frame where it has no meaning.
    #[error("RSV1 must be clear")]
    UnexpectedCompressionBit,
    /// The server must close the connection when an unmasked frame is received.
    #[error("MASK must be set")]
    UnmaskedFrameFromClient,
    /// The client must close the connection when a masked frame is received.
    #[error("MASK must be clear")]
    MaskedFrameFromServer,
    /// Control frames must not be fragmented.
    #[error("FIN must be set")]
    FragmentedControlFrame,
    /// Control frames must have a payload of 125 bytes or less, close frames
    /// carry either nothing or at least a status code.
    #[error("invalid payload length {0}")]
    InvalidControlPayloadLength(u8),
    /// Received a continue frame despite there being nothing to continue.
    #[error("invalid opcode 0")]
    UnexpectedContinueFrame,
    /// Received a new data frame while waiting for more fragments.
    #[error("invalid opcode {0}")]
    ExpectedFragment(Data),
    /// Encountered an invalid opcode.
    #[error("invalid opcode {0}")]
    InvalidOpcode(u8),
    /// The status code of a close frame is not allowed on the wire.
    #[error("invalid status code {0}")]
    InvalidCloseCode(u16),
}

/// A decompression failure, classified by the close code it maps to.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum InflateError {
    /// The compressed stream is malformed.
    #[error("invalid compressed data: {0}")]
    InvalidData(String),
    /// The inflated output grew past the configured limit.
    #[error("Max payload size exceeded")]
    TooLarge,
    /// The decompressor failed for a reason unrelated to the input.
    #[error("{0}")]
    Failed(String),
}

/// Invalid extension registration.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ExtensionError {
    /// Only `permessage-deflate` is understood by the receiver.
    #[error("Unsupported extension: {0}")]
    Unsupported(String),
}
