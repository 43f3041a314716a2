//! Utilities to work with raw WebSocket frames.

pub mod coding;

#[allow(clippy::module_inception)]
mod frame;
mod mask;
mod utf8;

pub use self::{
    frame::{FrameHeader, MAX_PAYLOAD_LENGTH},
    mask::apply_mask,
    utf8::Utf8Bytes,
};

pub(crate) use self::{
    frame::{parse_length_16, parse_length_64, HeaderContext, LENGTH_16, LENGTH_64},
    mask::is_noop as is_noop_mask,
};
