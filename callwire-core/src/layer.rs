//! Layer trait and abstractions.
//!
//! Layers wrap a transport with cross-cutting behaviour such as logging.
//! Each layer takes the inner [`CallFactory`] and returns a new one, so a
//! stack of layers is resolved statically while the client is built.

use crate::error::CallError;
use crate::transport::{CallFactory, RawCall};
use crate::types::Request;

/// Layer trait for wrapping transports.
pub trait Layer<F: CallFactory> {
    /// The type of the layered transport
    type LayeredCallFactory: CallFactory;

    /// Wrap the inner transport with this layer
    fn layer(&self, inner: F) -> Self::LayeredCallFactory;
}

/// Helper trait for layered transports.
///
/// Provides forwarding defaults so implementers only override what they
/// intercept.
pub trait LayeredCallFactory: Sized + CallFactory {
    /// The inner transport type
    type Inner: CallFactory;

    /// Get a reference to the inner transport
    fn inner(&self) -> &Self::Inner;

    /// Default implementation for new_call - forwards to inner
    fn layered_new_call(&self, request: Request) -> Result<Box<dyn RawCall>, CallError> {
        self.inner().new_call(request)
    }
}
