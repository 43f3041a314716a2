use std::fmt;

use bytes::Buf;

use super::coding::{Control, Data, OpCode};
use crate::{
    error::{CapacityError, ProtocolError},
    protocol::Role,
};

/// Largest payload length accepted in a 64-bit extended length field, 2^53 - 1.
pub const MAX_PAYLOAD_LENGTH: u64 = (1 << 53) - 1;

/// Largest control frame payload.
const MAX_CONTROL_PAYLOAD: u8 = 125;

/// 7-bit length value announcing a 16-bit extended length.
pub(crate) const LENGTH_16: u8 = 126;
/// 7-bit length value announcing a 64-bit extended length.
pub(crate) const LENGTH_64: u8 = 127;

/// What the header checks need to know about the connection and the message in progress.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct HeaderContext {
    /// Opcode of the first frame of a fragmented message, if one is in progress.
    pub fragmented: Option<Data>,
    /// Whether the fragmented message in progress is compressed.
    pub compressed: bool,
    /// Whether `permessage-deflate` was negotiated, allowing RSV1.
    pub deflate: bool,
    /// Mask policy to enforce, if any.
    pub role: Option<Role>,
}

/// A frame header as it is being read.
///
/// The `opcode` is the effective one: a continuation frame carries the opcode of the
/// message it continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Indicates that the frame is the last one of a possibly fragmented message.
    pub is_final: bool,
    /// RSV1 of the message this frame belongs to, the payload needs inflating.
    pub compressed: bool,
    /// WebSocket protocol opcode.
    pub opcode: OpCode,
    /// The MASK bit.
    pub masked: bool,
    /// Declared payload length.
    pub payload_length: u64,
    /// A frame mask, once read.
    pub mask: Option<[u8; 4]>,
}

impl Default for FrameHeader {
    fn default() -> Self {
        FrameHeader {
            is_final: true,
            compressed: false,
            opcode: OpCode::Control(Control::Close),
            masked: false,
            payload_length: 0,
            mask: None,
        }
    }
}

impl FrameHeader {
    /// Validate the two fixed header bytes.
    ///
    /// The 7-bit length is stored as is, the caller reads the extended length when it
    /// is 126 or 127.
    pub(crate) fn parse_base(
        first: u8,
        second: u8,
        ctx: &HeaderContext,
    ) -> Result<Self, ProtocolError> {
        let is_final = first & 0x80 != 0;
        let rsv1 = first & 0x40 != 0;
        let length = second & 0x7F;

        if first & 0x30 != 0 {
            return Err(ProtocolError::NonZeroReservedBits);
        }
        if rsv1 && !ctx.deflate {
            return Err(ProtocolError::UnexpectedCompressionBit);
        }

        let mut compressed = false;
        let opcode = match OpCode::from(first & 0x0F) {
            OpCode::Data(Data::Continue) => {
                if rsv1 {
                    return Err(ProtocolError::UnexpectedCompressionBit);
                }
                let data = ctx.fragmented.ok_or(ProtocolError::UnexpectedContinueFrame)?;
                compressed = ctx.compressed;
                OpCode::Data(data)
            }
            OpCode::Data(data @ (Data::Text | Data::Binary)) => {
                if ctx.fragmented.is_some() {
                    return Err(ProtocolError::ExpectedFragment(data));
                }
                compressed = rsv1;
                OpCode::Data(data)
            }
            OpCode::Control(ctl @ (Control::Close | Control::Ping | Control::Pong)) => {
                if !is_final {
                    return Err(ProtocolError::FragmentedControlFrame);
                }
                if rsv1 {
                    return Err(ProtocolError::UnexpectedCompressionBit);
                }
                // A close payload is empty or starts with a two byte status code.
                if length > MAX_CONTROL_PAYLOAD || (ctl == Control::Close && length == 1) {
                    return Err(ProtocolError::InvalidControlPayloadLength(length));
                }
                OpCode::Control(ctl)
            }
            reserved => return Err(ProtocolError::InvalidOpcode(reserved.into())),
        };

        let masked = second & 0x80 != 0;
        match ctx.role {
            Some(Role::Server) if !masked => return Err(ProtocolError::UnmaskedFrameFromClient),
            Some(Role::Client) if masked => return Err(ProtocolError::MaskedFrameFromServer),
            _ => {}
        }

        Ok(FrameHeader {
            is_final,
            compressed,
            opcode,
            masked,
            payload_length: length.into(),
            mask: None,
        })
    }
}

impl fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<FRAME> final: {} compressed: {} opcode: {} masked: {} payload length: {}",
            self.is_final, self.compressed, self.opcode, self.masked, self.payload_length
        )
    }
}

/// Read a 16-bit extended payload length.
pub(crate) fn parse_length_16(mut buf: impl Buf) -> u64 {
    buf.get_u16().into()
}

/// Read a 64-bit extended payload length as two big-endian halves, rejecting anything
/// above [`MAX_PAYLOAD_LENGTH`].
pub(crate) fn parse_length_64(mut buf: impl Buf) -> Result<u64, CapacityError> {
    let high = u64::from(buf.get_u32());
    let low = u64::from(buf.get_u32());
    let length = (high << 32) | low;
    if length > MAX_PAYLOAD_LENGTH {
        return Err(CapacityError::UnsupportedPayloadLength(length));
    }
    Ok(length)
}
