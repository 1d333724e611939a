//! Transport contract.
//!
//! The transport turns a [`Request`] into a single-use [`RawCall`] that
//! performs one network exchange, either blocking the caller or on a worker
//! the transport owns.

use crate::error::CallError;
use crate::types::{RawResponse, Request};
use std::fmt::Debug;
use std::sync::Arc;

/// Creates raw calls from requests.
pub trait CallFactory: Send + Sync + Debug + 'static {
    /// Create a single-use call for the request
    fn new_call(&self, request: Request) -> Result<Box<dyn RawCall>, CallError>;
}

impl<F: CallFactory + ?Sized> CallFactory for Arc<F> {
    fn new_call(&self, request: Request) -> Result<Box<dyn RawCall>, CallError> {
        (**self).new_call(request)
    }
}

/// One network exchange owned by the transport.
pub trait RawCall: Send + Sync + Debug {
    /// The request this call sends
    fn request(&self) -> &Request;

    /// Perform the exchange, blocking the calling thread until it completes
    fn execute(&self) -> Result<RawResponse, CallError>;

    /// Perform the exchange on a transport worker; the callback fires exactly once
    fn enqueue(&self, callback: Box<dyn RawCallback>);

    /// Ask the transport to abort; idempotent, valid before or after start
    fn cancel(&self);

    fn is_canceled(&self) -> bool;
}

/// Completion handler for [`RawCall::enqueue`].
///
/// Both methods consume the callback, so at most one of them can run.
pub trait RawCallback: Send {
    /// The exchange produced a response.
    ///
    /// An error returned here is fatal and belongs to the transport; every
    /// other failure has already been delivered to the caller.
    fn on_response(self: Box<Self>, response: RawResponse) -> Result<(), CallError>;

    /// The exchange failed before a response was available
    fn on_failure(self: Box<Self>, error: CallError);
}
