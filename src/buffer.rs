//! A queue of received chunks.
//!
//! The `ChunkQueue` is a first-in, first-out list of byte chunks as the transport
//! delivered them. Frames are read from its front in exact sizes, regardless of
//! where the chunk boundaries lie.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// Received bytes as accepted by [`crate::Receiver::add`].
///
/// Owned buffers are taken over without copying, borrowed slices are copied once.
#[derive(Debug, Default)]
pub struct Chunk(BytesMut);

impl Chunk {
    /// The buffered bytes.
    pub fn into_inner(self) -> BytesMut {
        self.0
    }
}

impl From<BytesMut> for Chunk {
    fn from(bytes: BytesMut) -> Self {
        Chunk(bytes)
    }
}

impl From<Bytes> for Chunk {
    fn from(bytes: Bytes) -> Self {
        Chunk(bytes.into())
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Chunk(Bytes::from(bytes).into())
    }
}

impl From<&[u8]> for Chunk {
    fn from(bytes: &[u8]) -> Self {
        Chunk(bytes.into())
    }
}

/// A FIFO of unconsumed chunks with a running byte count.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    chunks: VecDeque<BytesMut>,
    buffered: usize,
}

impl ChunkQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are dropped.
    pub fn add(&mut self, chunk: BytesMut) {
        if chunk.is_empty() {
            return;
        }
        self.buffered += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffered
    }

    /// Whether there is nothing buffered.
    pub fn is_empty(&self) -> bool {
        self.buffered == 0
    }

    /// Remove exactly `n` bytes from the front of the queue.
    ///
    /// Returns `None` and leaves the queue untouched if fewer than `n` bytes are buffered.
    /// Taking a whole chunk or a prefix of one does not copy, only a read spanning
    /// several chunks allocates.
    pub fn consume(&mut self, n: usize) -> Option<BytesMut> {
        if n > self.buffered {
            return None;
        }
        self.buffered -= n;

        let front = self.chunks.front_mut()?;
        if n == front.len() {
            return self.chunks.pop_front();
        }
        if n < front.len() {
            return Some(front.split_to(n));
        }

        let mut dst = BytesMut::with_capacity(n);
        while dst.len() < n {
            let mut chunk = self.chunks.pop_front()?;
            let wanted = n - dst.len();
            if wanted >= chunk.len() {
                dst.extend_from_slice(&chunk);
            } else {
                dst.extend_from_slice(&chunk.split_to(wanted));
                self.chunks.push_front(chunk);
            }
        }
        Some(dst)
    }

    /// The unconsumed part of the front chunk.
    pub fn front(&self) -> &[u8] {
        self.chunks.front().map(|chunk| &chunk[..]).unwrap_or_default()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.buffered = 0;
    }
}
