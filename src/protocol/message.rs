use std::{fmt, mem, str};

use bytes::{Bytes, BytesMut};
use log::trace;

use super::frame::{coding::Data, Utf8Bytes};
use crate::error::{CapacityError, Error, Result};

/// Representation of received binary messages, chosen once per receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryType {
    /// One contiguous buffer.
    #[default]
    Typed,
    /// An owned byte vector.
    Raw,
    /// The received fragments as they arrived, never concatenated.
    FragmentsList,
}

/// Binary message data in the representation selected by [`BinaryType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryData {
    /// See [`BinaryType::Typed`].
    Typed(Bytes),
    /// See [`BinaryType::Raw`].
    Raw(Vec<u8>),
    /// See [`BinaryType::FragmentsList`].
    Fragments(Vec<Bytes>),
}

impl BinaryData {
    /// Total length in bytes.
    pub fn len(&self) -> usize {
        match self {
            BinaryData::Typed(data) => data.len(),
            BinaryData::Raw(data) => data.len(),
            BinaryData::Fragments(fragments) => fragments.iter().map(Bytes::len).sum(),
        }
    }

    /// Returns true if there is no data at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into a single contiguous buffer.
    pub fn into_bytes(self) -> Bytes {
        match self {
            BinaryData::Typed(data) => data,
            BinaryData::Raw(data) => data.into(),
            BinaryData::Fragments(fragments) => {
                let len = fragments.iter().map(Bytes::len).sum();
                concat(fragments, len)
            }
        }
    }
}

/// An enum representing the received forms of a WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A text WebSocket message
    Text(Utf8Bytes),
    /// A binary WebSocket message
    Binary(BinaryData),
}

impl Message {
    /// Indicates whether a message is a text message.
    pub fn is_text(&self) -> bool {
        matches!(*self, Message::Text(_))
    }

    /// Indicates whether a message is a binary message.
    pub fn is_binary(&self) -> bool {
        matches!(*self, Message::Binary(_))
    }

    /// Get the length of the WebSocket message.
    pub fn len(&self) -> usize {
        match self {
            Message::Text(string) => string.len(),
            Message::Binary(data) => data.len(),
        }
    }

    /// Returns true if the WebSocket message has no content.
    /// For example, if the other side of the connection sent an empty string.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the WebSocket message and return it as binary data.
    pub fn into_data(self) -> Bytes {
        match self {
            Message::Text(string) => string.into(),
            Message::Binary(data) => data.into_bytes(),
        }
    }

    /// Attempt to get a &str from the WebSocket message,
    /// this will try to convert binary data to utf8.
    pub fn to_text(&self) -> Result<&str> {
        match self {
            Message::Text(string) => Ok(string.as_str()),
            Message::Binary(BinaryData::Typed(data)) => Ok(str::from_utf8(data)?),
            Message::Binary(BinaryData::Raw(data)) => Ok(str::from_utf8(data)?),
            Message::Binary(BinaryData::Fragments(_)) => Err(Error::Utf8),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Ok(string) = self.to_text() {
            write!(f, "{}", string)
        } else {
            write!(f, "Binary Data<length={}>", self.len())
        }
    }
}

/// Join buffers, reusing the only one if there is a single fragment.
pub(crate) fn concat(mut fragments: Vec<Bytes>, total_len: usize) -> Bytes {
    if fragments.len() <= 1 {
        return fragments.pop().unwrap_or_default();
    }
    let mut buf = BytesMut::with_capacity(total_len);
    for fragment in &fragments {
        buf.extend_from_slice(fragment);
    }
    buf.freeze()
}

/// Reassembles data frames into messages and keeps the payload budgets.
#[derive(Debug, Default)]
pub(crate) struct MessageAssembler {
    /// Opcode of the first frame of the fragmented message in progress.
    fragmented: Option<Data>,
    /// Whether the message in progress is compressed.
    compressed: bool,
    fragments: Vec<Bytes>,
    /// Size of the buffered (inflated) fragments.
    message_length: usize,
    /// Declared wire length of all data frames since the last message.
    total_payload_length: u64,
    max_payload: usize,
    binary_type: BinaryType,
}

impl MessageAssembler {
    pub fn new(max_payload: usize, binary_type: BinaryType) -> Self {
        MessageAssembler { max_payload, binary_type, ..Default::default() }
    }

    pub fn fragmented(&self) -> Option<Data> {
        self.fragmented
    }

    pub fn compressed(&self) -> bool {
        self.compressed
    }

    /// Remember the opcode of a message that continues in further frames.
    pub fn start_fragmented(&mut self, opcode: Data, compressed: bool) {
        if self.fragmented.is_none() {
            self.fragmented = Some(opcode);
            self.compressed = compressed;
        }
    }

    /// Account for a data frame before its payload is read.
    pub fn reserve(&mut self, payload_length: u64) -> Result<(), CapacityError> {
        if payload_length == 0 {
            return Ok(());
        }
        self.total_payload_length = self.total_payload_length.saturating_add(payload_length);
        self.check(self.total_payload_length)
    }

    /// Buffer a data payload (already inflated, if compressed).
    pub fn push(&mut self, payload: Bytes) -> Result<(), CapacityError> {
        if payload.is_empty() {
            return Ok(());
        }
        self.message_length += payload.len();
        self.check(self.message_length as u64)?;
        self.fragments.push(payload);
        Ok(())
    }

    /// Finish the message. `opcode` is the effective opcode of the final frame.
    pub fn complete(&mut self, opcode: Data) -> Result<Message> {
        let fragments = mem::take(&mut self.fragments);
        let message_length = self.message_length;
        self.reset();
        trace!("Assembled {} bytes from {} fragment(s)", message_length, fragments.len());

        match opcode {
            Data::Text => {
                let text = Utf8Bytes::try_from(concat(fragments, message_length))?;
                Ok(Message::Text(text))
            }
            _ => Ok(Message::Binary(match self.binary_type {
                BinaryType::Typed => BinaryData::Typed(concat(fragments, message_length)),
                BinaryType::Raw => BinaryData::Raw(concat(fragments, message_length).into()),
                BinaryType::FragmentsList => BinaryData::Fragments(fragments),
            })),
        }
    }

    /// Forget the message in progress and the budgets.
    pub fn reset(&mut self) {
        self.fragmented = None;
        self.compressed = false;
        self.fragments = Vec::new();
        self.message_length = 0;
        self.total_payload_length = 0;
    }

    fn check(&self, size: u64) -> Result<(), CapacityError> {
        if self.max_payload > 0 && size > self.max_payload as u64 {
            return Err(CapacityError::MessageTooLong { size, max_size: self.max_payload });
        }
        Ok(())
    }
}
