//! Opcodes and close codes of RFC 6455.

use std::fmt;

/// Frame opcode, split into data and control opcodes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OpCode {
    /// Text, binary or continuation.
    Data(Data),
    /// Close, ping or pong.
    Control(Control),
}

/// Data opcodes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Data {
    /// 0x0, continues the message in progress
    Continue,
    /// 0x1
    Text,
    /// 0x2
    Binary,
    /// 0x3-7, rejected by the receiver
    Reserved(u8),
}

/// Control opcodes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Control {
    /// 0x8
    Close,
    /// 0x9
    Ping,
    /// 0xa
    Pong,
    /// 0xb-f, rejected by the receiver
    Reserved(u8),
}

impl OpCode {
    /// Test whether this is a close, ping or pong opcode.
    pub fn is_control(self) -> bool {
        matches!(self, OpCode::Control(_))
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", u8::from(OpCode::Data(*self)))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

impl From<OpCode> for u8 {
    fn from(code: OpCode) -> Self {
        match code {
            OpCode::Data(Data::Continue) => 0,
            OpCode::Data(Data::Text) => 1,
            OpCode::Data(Data::Binary) => 2,
            OpCode::Data(Data::Reserved(i)) => i,
            OpCode::Control(Control::Close) => 8,
            OpCode::Control(Control::Ping) => 9,
            OpCode::Control(Control::Pong) => 10,
            OpCode::Control(Control::Reserved(i)) => i,
        }
    }
}

impl From<u8> for OpCode {
    /// Only the low four bits of `byte` are looked at.
    fn from(byte: u8) -> OpCode {
        match byte & 0x0F {
            0 => OpCode::Data(Data::Continue),
            1 => OpCode::Data(Data::Text),
            2 => OpCode::Data(Data::Binary),
            i @ 3..=7 => OpCode::Data(Data::Reserved(i)),
            8 => OpCode::Control(Control::Close),
            9 => OpCode::Control(Control::Ping),
            10 => OpCode::Control(Control::Pong),
            i => OpCode::Control(Control::Reserved(i)),
        }
    }
}

/// Status code of a close frame.
///
/// The receiver reports the code of a received close frame to
/// [`Handler::on_close`](crate::Handler::on_close) and picks one for every error it
/// reports to [`Handler::on_error`](crate::Handler::on_error).
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum CloseCode {
    /// 1000, normal closure.
    Normal,
    /// 1001, the endpoint is going away.
    Away,
    /// 1002, protocol error. Every framing violation maps to it.
    Protocol,
    /// 1003, a type of data the endpoint does not accept.
    Unsupported,
    /// 1005, reported for a close frame without a payload. Never valid on the wire.
    Status,
    /// 1006, never valid on the wire.
    Abnormal,
    /// 1007, invalid UTF-8 in a text message or close reason, or malformed compressed data.
    Invalid,
    /// 1008, policy violation.
    Policy,
    /// 1009, a message or frame above the configured limits.
    Size,
    /// 1010, an extension the client needed was not negotiated.
    Extension,
    /// 1011, unexpected condition on the server.
    Error,
    /// 1012, the server is restarting.
    Restart,
    /// 1013, try again later.
    Again,
    /// 1014, bad gateway.
    BadGateway,
    /// 1015, TLS handshake failure. Never valid on the wire.
    Tls,
    /// 1016-2999, reserved for future use. Never valid on the wire.
    Reserved(u16),
    /// 3000-3999, registered with IANA.
    Iana(u16),
    /// 4000-4999, private use.
    Library(u16),
    /// Outside of every defined range.
    Bad(u16),
}

impl CloseCode {
    /// Check if this CloseCode is allowed in a close frame received from the wire.
    pub fn is_allowed(self) -> bool {
        !matches!(
            self,
            CloseCode::Bad(_)
                | CloseCode::Reserved(_)
                | CloseCode::Status
                | CloseCode::Abnormal
                | CloseCode::Tls
        )
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", u16::from(*self))
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> u16 {
        match code {
            CloseCode::Normal => 1000,
            CloseCode::Away => 1001,
            CloseCode::Protocol => 1002,
            CloseCode::Unsupported => 1003,
            CloseCode::Status => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::Invalid => 1007,
            CloseCode::Policy => 1008,
            CloseCode::Size => 1009,
            CloseCode::Extension => 1010,
            CloseCode::Error => 1011,
            CloseCode::Restart => 1012,
            CloseCode::Again => 1013,
            CloseCode::BadGateway => 1014,
            CloseCode::Tls => 1015,
            CloseCode::Reserved(code)
            | CloseCode::Iana(code)
            | CloseCode::Library(code)
            | CloseCode::Bad(code) => code,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> CloseCode {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::Away,
            1002 => CloseCode::Protocol,
            1003 => CloseCode::Unsupported,
            1005 => CloseCode::Status,
            1006 => CloseCode::Abnormal,
            1007 => CloseCode::Invalid,
            1008 => CloseCode::Policy,
            1009 => CloseCode::Size,
            1010 => CloseCode::Extension,
            1011 => CloseCode::Error,
            1012 => CloseCode::Restart,
            1013 => CloseCode::Again,
            1014 => CloseCode::BadGateway,
            1015 => CloseCode::Tls,
            1016..=2999 => CloseCode::Reserved(code),
            3000..=3999 => CloseCode::Iana(code),
            4000..=4999 => CloseCode::Library(code),
            _ => CloseCode::Bad(code),
        }
    }
}
