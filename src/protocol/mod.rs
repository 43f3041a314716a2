//! Incremental WebSocket frame receiver.

pub mod frame;

mod message;

pub use self::message::{BinaryData, BinaryType, Message};

use std::fmt;

use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};

use self::{
    frame::{
        apply_mask,
        coding::{CloseCode, Control as OpCtl, OpCode},
        is_noop_mask, parse_length_16, parse_length_64, FrameHeader, HeaderContext, Utf8Bytes,
        LENGTH_16, LENGTH_64,
    },
    message::MessageAssembler,
};
use crate::{
    buffer::{Chunk, ChunkQueue},
    error::{CapacityError, Error, InflateError, ProtocolError, Result},
    extensions::{Extensions, Inflation},
};

/// Default value of [`ReceiverConfig::max_payload`], 100 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 100 << 20;

/// Indicates a Client or Server role of the websocket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This socket is a server
    Server,
    /// This socket is a client
    Client,
}

/// The configuration of a [`Receiver`].
///
/// # Example
/// ```
/// # use websocket_receiver::{BinaryType, ReceiverConfig, Role};
/// let config = ReceiverConfig::default()
///     .max_payload(16 << 20)
///     .binary_type(BinaryType::FragmentsList)
///     .role(Some(Role::Server));
/// assert_eq!(config.max_payload, 16 << 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct ReceiverConfig {
    /// The maximum size of an incoming message, compressed or not. `0` means no limit.
    /// The default value is 100 MiB which should be reasonably big for all normal
    /// use-cases but small enough to prevent memory eating by a malicious user.
    pub max_payload: usize,
    /// How binary messages are delivered.
    pub binary_type: BinaryType,
    /// When set, the masking rules of RFC 6455 for this side are enforced: a server
    /// rejects unmasked frames and a client rejects masked ones. By default both
    /// are accepted.
    pub role: Option<Role>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            max_payload: DEFAULT_MAX_PAYLOAD,
            binary_type: BinaryType::default(),
            role: None,
        }
    }
}

impl ReceiverConfig {
    /// Set [`Self::max_payload`].
    pub fn max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Set [`Self::binary_type`].
    pub fn binary_type(mut self, binary_type: BinaryType) -> Self {
        self.binary_type = binary_type;
        self
    }

    /// Set [`Self::role`].
    pub fn role(mut self, role: Option<Role>) -> Self {
        self.role = role;
        self
    }
}

/// The part of a frame the receiver is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// The two fixed header bytes.
    AwaitingHeader,
    /// A 16-bit extended payload length.
    AwaitingExtendedLength16,
    /// A 64-bit extended payload length.
    AwaitingExtendedLength64,
    /// The masking key.
    AwaitingMask,
    /// The payload.
    AwaitingPayload,
    /// The outcome of a decompression.
    Inflating,
}

/// Receives the events of a [`Receiver`].
///
/// All methods do nothing by default.
pub trait Handler {
    /// A complete text or binary message.
    fn on_message(&mut self, _message: Message) {}

    /// A valid close frame. Code 1005 means the frame carried no status code.
    fn on_close(&mut self, _code: CloseCode, _reason: Utf8Bytes) {}

    /// A fatal error, together with the close code to answer the peer with.
    fn on_error(&mut self, _error: Error, _code: CloseCode) {}

    /// A ping frame.
    fn on_ping(&mut self, _payload: Bytes) {}

    /// A pong frame.
    fn on_pong(&mut self, _payload: Bytes) {}
}

impl Handler for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Suspend,
}

/// An incremental WebSocket frame receiver.
///
/// Bytes are fed with [`Receiver::add`] in chunks of any size; events are reported to the
/// [`Handler`] as soon as the frames they belong to are complete. The receiver never
/// writes: answering pings, echoing close frames or closing the transport after an
/// error is up to the caller.
pub struct Receiver<H> {
    handler: H,
    config: ReceiverConfig,
    extensions: Extensions,
    buffer: ChunkQueue,
    state: ParserState,
    /// The frame currently being read.
    header: FrameHeader,
    assembler: MessageAssembler,
    /// Set after a close frame, an error or a cleanup. No more input is parsed.
    halted: bool,
    /// Teardown requested while a decompression was outstanding.
    pending_cleanup: Option<Box<dyn FnOnce()>>,
}

impl<H: Handler> Receiver<H> {
    /// Create a receiver without extensions.
    pub fn new(handler: H, config: ReceiverConfig) -> Self {
        Receiver::with_extensions(handler, config, Extensions::new())
    }

    /// Create a receiver for a connection that negotiated `extensions`.
    pub fn with_extensions(handler: H, config: ReceiverConfig, mut extensions: Extensions) -> Self {
        extensions.limit_output(config.max_payload);
        Receiver {
            handler,
            config,
            extensions,
            buffer: ChunkQueue::new(),
            state: ParserState::AwaitingHeader,
            header: FrameHeader::default(),
            assembler: MessageAssembler::new(config.max_payload, config.binary_type),
            halted: false,
            pending_cleanup: None,
        }
    }

    /// Feed a chunk of received bytes.
    ///
    /// Any number of handler methods may be called before this returns. While a
    /// decompression is pending the chunk is only buffered.
    pub fn add(&mut self, chunk: impl Into<Chunk>) {
        let chunk = chunk.into().into_inner();
        if self.halted || self.pending_cleanup.is_some() {
            warn!("Ignoring {} bytes received after the receiver stopped", chunk.len());
            return;
        }
        self.buffer.add(chunk);
        if self.state != ParserState::Inflating {
            self.run();
        }
    }

    /// Complete a decompression that returned [`Inflation::Pending`].
    ///
    /// Parsing resumes with the bytes buffered in the meantime. If [`Receiver::cleanup`]
    /// was called while the decompression was outstanding, the result is dropped and the
    /// teardown finishes instead.
    pub fn resume_inflate(&mut self, result: Result<Bytes, InflateError>) {
        if self.state != ParserState::Inflating {
            warn!("No decompression is pending, ignoring its result");
            return;
        }
        self.state = ParserState::AwaitingHeader;

        if let Some(on_done) = self.pending_cleanup.take() {
            debug!("Dropping inflated payload, the receiver is being cleaned up");
            self.teardown();
            on_done();
            return;
        }

        match self.inflated(result) {
            Ok(_) => self.run(),
            Err(err) => self.fail(err),
        }
    }

    /// Release everything the receiver holds and stop it.
    ///
    /// `on_done` is called once the teardown is complete: right away, or after the
    /// outstanding decompression resolved through [`Receiver::resume_inflate`].
    pub fn cleanup(&mut self, on_done: impl FnOnce() + 'static) {
        if self.state == ParserState::Inflating {
            trace!("Decompression in flight, deferring cleanup");
            let deferred: Box<dyn FnOnce()> = match self.pending_cleanup.take() {
                Some(earlier) => Box::new(move || {
                    earlier();
                    on_done();
                }),
                None => Box::new(on_done),
            };
            self.pending_cleanup = Some(deferred);
            return;
        }
        self.teardown();
        on_done();
    }

    /// The part of a frame the receiver waits for.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Whether the receiver stopped parsing for good.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The active configuration.
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Returns a shared reference to the handler.
    pub fn get_ref(&self) -> &H {
        &self.handler
    }

    /// Returns a mutable reference to the handler.
    pub fn get_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the receiver, returning the handler.
    pub fn into_inner(self) -> H {
        self.handler
    }

    fn run(&mut self) {
        while !self.halted {
            let step = match self.state {
                ParserState::AwaitingHeader => self.read_header(),
                ParserState::AwaitingExtendedLength16 => self.read_length_16(),
                ParserState::AwaitingExtendedLength64 => self.read_length_64(),
                ParserState::AwaitingMask => self.read_mask(),
                ParserState::AwaitingPayload => self.read_payload(),
                ParserState::Inflating => return,
            };
            match step {
                Ok(Step::Continue) => {}
                Ok(Step::Suspend) => return,
                Err(err) => return self.fail(err),
            }
        }
    }

    fn read_header(&mut self) -> Result<Step> {
        let Some(bytes) = self.buffer.consume(2) else {
            return Ok(Step::Suspend);
        };
        let ctx = HeaderContext {
            fragmented: self.assembler.fragmented(),
            compressed: self.assembler.compressed(),
            deflate: self.extensions.has_permessage_deflate(),
            role: self.config.role,
        };
        let header = FrameHeader::parse_base(bytes[0], bytes[1], &ctx)?;
        trace!("Parsed headers {}", header);

        if let OpCode::Data(opcode) = header.opcode {
            if !header.is_final {
                self.assembler.start_fragmented(opcode, header.compressed);
            }
        }

        let length = header.payload_length;
        self.header = header;
        match u8::try_from(length) {
            Ok(LENGTH_16) => self.state = ParserState::AwaitingExtendedLength16,
            Ok(LENGTH_64) => self.state = ParserState::AwaitingExtendedLength64,
            _ => self.length_complete()?,
        }
        Ok(Step::Continue)
    }

    fn read_length_16(&mut self) -> Result<Step> {
        let Some(bytes) = self.buffer.consume(2) else {
            return Ok(Step::Suspend);
        };
        self.header.payload_length = parse_length_16(bytes);
        self.length_complete()?;
        Ok(Step::Continue)
    }

    fn read_length_64(&mut self) -> Result<Step> {
        let Some(bytes) = self.buffer.consume(8) else {
            return Ok(Step::Suspend);
        };
        self.header.payload_length = parse_length_64(bytes)?;
        self.length_complete()?;
        Ok(Step::Continue)
    }

    fn length_complete(&mut self) -> Result<()> {
        if !self.header.opcode.is_control() {
            self.assembler.reserve(self.header.payload_length)?;
        }
        self.state = if self.header.masked {
            ParserState::AwaitingMask
        } else {
            ParserState::AwaitingPayload
        };
        Ok(())
    }

    fn read_mask(&mut self) -> Result<Step> {
        let Some(bytes) = self.buffer.consume(4) else {
            return Ok(Step::Suspend);
        };
        let mut mask = [0u8; 4];
        mask.copy_from_slice(&bytes);
        self.header.mask = Some(mask);
        self.state = ParserState::AwaitingPayload;
        Ok(Step::Continue)
    }

    fn read_payload(&mut self) -> Result<Step> {
        let length = self.header.payload_length;
        let length = usize::try_from(length)
            .map_err(|_| CapacityError::UnsupportedPayloadLength(length))?;
        let mut payload = if length == 0 {
            BytesMut::new()
        } else {
            match self.buffer.consume(length) {
                Some(payload) => payload,
                None => return Ok(Step::Suspend),
            }
        };
        if let Some(mask) = self.header.mask {
            if !is_noop_mask(mask) {
                apply_mask(&mut payload, mask);
            }
        }
        let payload = payload.freeze();

        match self.header.opcode {
            OpCode::Control(ctl) => {
                self.state = ParserState::AwaitingHeader;
                self.control_frame(ctl, payload)
            }
            OpCode::Data(_) if self.header.compressed => self.decompress(payload),
            OpCode::Data(_) => {
                self.state = ParserState::AwaitingHeader;
                self.data_frame(payload)
            }
        }
    }

    fn decompress(&mut self, payload: Bytes) -> Result<Step> {
        let fin = self.header.is_final;
        let Some(inflater) = self.extensions.inflater_mut() else {
            return Err(ProtocolError::UnexpectedCompressionBit.into());
        };
        self.state = ParserState::Inflating;
        match inflater.decompress(payload, fin) {
            Inflation::Ready(result) => {
                self.state = ParserState::AwaitingHeader;
                self.inflated(result)
            }
            Inflation::Pending => {
                trace!("Decompression pending");
                Ok(Step::Suspend)
            }
        }
    }

    fn inflated(&mut self, result: Result<Bytes, InflateError>) -> Result<Step> {
        self.data_frame(result?)
    }

    fn data_frame(&mut self, payload: Bytes) -> Result<Step> {
        self.assembler.push(payload)?;
        if let (OpCode::Data(opcode), true) = (self.header.opcode, self.header.is_final) {
            let message = self.assembler.complete(opcode)?;
            debug!("Received message {}", message);
            self.handler.on_message(message);
        }
        Ok(Step::Continue)
    }

    fn control_frame(&mut self, ctl: OpCtl, payload: Bytes) -> Result<Step> {
        match ctl {
            OpCtl::Close => {
                let (code, reason) = parse_close(payload)?;
                debug!("Received close frame: {} {}", code, reason);
                self.halted = true;
                self.buffer.clear();
                self.assembler.reset();
                self.handler.on_close(code, reason);
                Ok(Step::Suspend)
            }
            OpCtl::Ping => {
                trace!("Received ping, {} bytes", payload.len());
                self.handler.on_ping(payload);
                Ok(Step::Continue)
            }
            OpCtl::Pong => {
                trace!("Received pong, {} bytes", payload.len());
                self.handler.on_pong(payload);
                Ok(Step::Continue)
            }
            OpCtl::Reserved(i) => Err(ProtocolError::InvalidOpcode(i).into()),
        }
    }

    /// Halt for good and report `err` once.
    fn fail(&mut self, err: Error) {
        if self.halted {
            return;
        }
        let code = err.close_code();
        debug!("Receiver failed with {}: {}", code, err);
        self.halted = true;
        self.handler.on_error(err, code);
        self.teardown();
    }

    fn teardown(&mut self) {
        self.halted = true;
        self.buffer.clear();
        self.assembler.reset();
        self.header = FrameHeader::default();
        self.state = ParserState::AwaitingHeader;
    }
}

/// Split a close payload into a status code and the reason text.
fn parse_close(payload: Bytes) -> Result<(CloseCode, Utf8Bytes)> {
    if payload.is_empty() {
        return Ok((CloseCode::Status, Utf8Bytes::default()));
    }
    if payload.len() < 2 {
        return Err(ProtocolError::InvalidControlPayloadLength(1).into());
    }
    let raw = u16::from_be_bytes([payload[0], payload[1]]);
    let code = CloseCode::from(raw);
    if !code.is_allowed() {
        return Err(ProtocolError::InvalidCloseCode(raw).into());
    }
    let reason = Utf8Bytes::try_from(payload.slice(2..))?;
    Ok((code, reason))
}

impl<H: fmt::Debug> fmt::Debug for Receiver<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("handler", &self.handler)
            .field("config", &self.config)
            .field("extensions", &self.extensions)
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .field("halted", &self.halted)
            .finish()
    }
}
