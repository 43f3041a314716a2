//! Built-in `permessage-deflate` inflater

use bytes::Bytes;
use flate2::{Decompress, FlushDecompress, Status};
use log::trace;

use super::{Inflate, Inflation};
use crate::error::InflateError;

/// Appended to the last frame of every message, RFC 7692 7.2.2.
const TRAILER: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

/// Output space reserved whenever the inflater runs out of it.
const OUTPUT_CHUNK: usize = 16 * 1024;

/// Configuration of the built-in inflater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct DeflateConfig {
    /// Largest inflated message in bytes. `0` leaves the limit to the receiver's
    /// `max_payload`, otherwise the smaller of both applies.
    pub max_payload: usize,
    /// Whether the peer resets its LZ77 window after every message, so must we.
    pub no_context_takeover: bool,
}

impl DeflateConfig {
    /// Set [`Self::max_payload`].
    pub fn max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Set [`Self::no_context_takeover`].
    pub fn no_context_takeover(mut self, no_context_takeover: bool) -> Self {
        self.no_context_takeover = no_context_takeover;
        self
    }
}

/// A synchronous `permessage-deflate` inflater over `flate2`.
///
/// A window of 15 bits decompresses anything a peer compressed with a smaller one,
/// so the negotiated `*_max_window_bits` do not matter on this side.
#[derive(Debug)]
pub struct DeflateInflater {
    config: DeflateConfig,
    decompress: Decompress,
    /// Effective output limit, `0` is unlimited.
    limit: usize,
    /// Inflated size of the message in progress.
    message_size: usize,
    /// The message in progress ended its deflate stream with a final block.
    stream_ended: bool,
}

impl DeflateInflater {
    /// Create an inflater with the given configuration.
    pub fn new(config: DeflateConfig) -> Self {
        DeflateInflater {
            config,
            decompress: Decompress::new(false),
            limit: config.max_payload,
            message_size: 0,
            stream_ended: false,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &DeflateConfig {
        &self.config
    }

    fn inflate(&mut self, payload: &[u8], fin: bool) -> Result<Bytes, InflateError> {
        let mut output = Vec::with_capacity(payload.len().saturating_mul(2).max(64));
        self.run(payload, &mut output)?;
        if fin {
            // A final block needs no sync marker, the stream is already complete.
            if !self.stream_ended {
                self.run(&TRAILER, &mut output)?;
            }
            self.stream_ended = false;
            self.message_size = 0;
            if self.config.no_context_takeover {
                self.decompress.reset(false);
            }
        }
        trace!("Inflated {} bytes into {}", payload.len(), output.len());
        Ok(output.into())
    }

    fn run(&mut self, mut input: &[u8], output: &mut Vec<u8>) -> Result<(), InflateError> {
        if !input.is_empty() {
            self.stream_ended = false;
        }
        loop {
            if output.len() == output.capacity() {
                output.reserve(OUTPUT_CHUNK);
            }

            let before_in = self.decompress.total_in();
            let before_out = output.len();
            let status = self
                .decompress
                .decompress_vec(input, output, FlushDecompress::Sync)
                .map_err(|err| InflateError::InvalidData(err.to_string()))?;
            let consumed = (self.decompress.total_in() - before_in) as usize;
            input = &input[consumed..];

            self.message_size += output.len() - before_out;
            if self.limit > 0 && self.message_size > self.limit {
                self.message_size = 0;
                return Err(InflateError::TooLarge);
            }

            match status {
                Status::StreamEnd => {
                    // Final deflate block, what follows starts a new stream.
                    self.decompress.reset(false);
                    if input.is_empty() {
                        self.stream_ended = true;
                        return Ok(());
                    }
                }
                Status::Ok | Status::BufError => {
                    let stalled = consumed == 0 && output.len() == before_out;
                    if output.len() < output.capacity() && (input.is_empty() || stalled) {
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl Default for DeflateInflater {
    fn default() -> Self {
        DeflateInflater::new(DeflateConfig::default())
    }
}

impl Inflate for DeflateInflater {
    fn decompress(&mut self, payload: Bytes, fin: bool) -> Inflation {
        Inflation::Ready(self.inflate(&payload, fin))
    }

    fn limit_output(&mut self, max_payload: usize) {
        self.limit = match (self.config.max_payload, max_payload) {
            (0, limit) | (limit, 0) => limit,
            (own, receiver) => own.min(receiver),
        };
    }
}
