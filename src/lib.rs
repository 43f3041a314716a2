//! Incremental WebSocket frame receiver.
//!
//! Feed the bytes of a connection in chunks of any size to a [`Receiver`] and get
//! validated messages, control frames and protocol errors back through a [`Handler`].
//! Framing follows RFC 6455, compressed messages use the `permessage-deflate`
//! extension of RFC 7692.
//!
//! ```
//! use websocket_receiver::{Handler, Message, Receiver, ReceiverConfig};
//!
//! #[derive(Default)]
//! struct Print(Vec<String>);
//!
//! impl Handler for Print {
//!     fn on_message(&mut self, message: Message) {
//!         self.0.push(message.to_string());
//!     }
//! }
//!
//! let mut receiver = Receiver::new(Print::default(), ReceiverConfig::default());
//! receiver.add(&b"\x81\x05Hel"[..]);
//! receiver.add(&b"lo"[..]);
//! assert_eq!(receiver.get_ref().0, ["Hello"]);
//! ```
#![deny(
    missing_docs,
    missing_copy_implementations,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_must_use,
    unused_mut,
    unused_imports,
    unused_import_braces
)]

pub mod buffer;
pub mod error;
pub mod extensions;
pub mod protocol;

pub use crate::{
    error::{Error, Result},
    protocol::{
        frame::{coding::CloseCode, Utf8Bytes},
        BinaryData, BinaryType, Handler, Message, ParserState, Receiver, ReceiverConfig, Role,
    },
};
