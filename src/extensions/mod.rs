//! WebSocket extensions.
// Only `permessage-deflate` is supported at the moment.

#[cfg(feature = "deflate")]
mod deflate;
#[cfg(feature = "deflate")]
pub use self::deflate::{DeflateConfig, DeflateInflater};

use std::fmt;

use bytes::Bytes;

use crate::error::{ExtensionError, InflateError};

/// The WebSocket Extension Identifier as per the IANA registry.
pub const PERMESSAGE_DEFLATE: &str = "permessage-deflate";

/// Outcome of handing one compressed payload to an [`Inflate`] adapter.
#[derive(Debug)]
pub enum Inflation {
    /// The payload was inflated, or failed to, right away.
    Ready(Result<Bytes, InflateError>),
    /// The adapter completes later. The result must be passed to
    /// [`Receiver::resume_inflate`](crate::Receiver::resume_inflate).
    Pending,
}

/// The decompression side of a negotiated `permessage-deflate` extension.
///
/// The receiver calls `decompress` once per compressed frame, in order, and never
/// starts the next call before the previous one resolved. `fin` marks the last
/// frame of a message: the adapter is expected to finish the message (append the
/// `00 00 ff ff` trailer, reset its window if context takeover is off).
pub trait Inflate {
    /// Inflate the payload of one frame.
    fn decompress(&mut self, payload: Bytes, fin: bool) -> Inflation;

    /// Called once with the receiver's `max_payload` (`0` is unlimited) so that
    /// inflation can stop as soon as a message outgrows it. Ignored by default.
    fn limit_output(&mut self, _max_payload: usize) {}
}

impl<F> Inflate for F
where
    F: FnMut(Bytes, bool) -> Inflation,
{
    fn decompress(&mut self, payload: Bytes, fin: bool) -> Inflation {
        self(payload, fin)
    }
}

/// The extensions negotiated for a connection, keyed by name.
#[derive(Default)]
pub struct Extensions {
    deflate: Option<Box<dyn Inflate>>,
}

impl Extensions {
    /// No extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the adapter of a negotiated extension.
    ///
    /// Fails if `name` is not [`PERMESSAGE_DEFLATE`].
    pub fn insert(
        &mut self,
        name: &str,
        adapter: impl Inflate + 'static,
    ) -> Result<(), ExtensionError> {
        if name != PERMESSAGE_DEFLATE {
            return Err(ExtensionError::Unsupported(name.into()));
        }
        self.deflate = Some(Box::new(adapter));
        Ok(())
    }

    /// Register a `permessage-deflate` adapter.
    pub fn with_permessage_deflate(mut self, adapter: impl Inflate + 'static) -> Self {
        self.deflate = Some(Box::new(adapter));
        self
    }

    /// Whether `permessage-deflate` was negotiated.
    pub fn has_permessage_deflate(&self) -> bool {
        self.deflate.is_some()
    }

    pub(crate) fn inflater_mut(&mut self) -> Option<&mut (dyn Inflate + 'static)> {
        self.deflate.as_deref_mut()
    }

    pub(crate) fn limit_output(&mut self, max_payload: usize) {
        if let Some(inflater) = self.deflate.as_deref_mut() {
            inflater.limit_output(max_payload);
        }
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        if self.deflate.is_some() {
            list.entry(&PERMESSAGE_DEFLATE);
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(payload: Bytes, _fin: bool) -> Inflation {
        Inflation::Ready(Ok(payload))
    }

    #[test]
    fn only_permessage_deflate_is_known() {
        let mut extensions = Extensions::new();
        assert!(!extensions.has_permessage_deflate());
        assert_eq!(
            extensions.insert("x-webkit-deflate-frame", identity),
            Err(ExtensionError::Unsupported("x-webkit-deflate-frame".into()))
        );
        assert!(!extensions.has_permessage_deflate());

        extensions.insert(PERMESSAGE_DEFLATE, identity).unwrap();
        assert!(extensions.has_permessage_deflate());
        assert_eq!(format!("{:?}", extensions), r#"["permessage-deflate"]"#);
    }

    #[test]
    fn closures_are_adapters() {
        let mut extensions = Extensions::new().with_permessage_deflate(identity);
        let inflater = extensions.inflater_mut().unwrap();
        match inflater.decompress(Bytes::from_static(b"abc"), true) {
            Inflation::Ready(Ok(data)) => assert_eq!(data, Bytes::from_static(b"abc")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
