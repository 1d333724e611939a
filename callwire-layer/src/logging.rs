//! Logging layer for raw exchanges.

use callwire_core::error::CallError;
use callwire_core::layer::{Layer, LayeredCallFactory};
use callwire_core::transport::{CallFactory, RawCall, RawCallback};
use callwire_core::types::{RawResponse, Request};
use std::sync::Arc;
use std::time::Instant;

/// Logging layer that logs every exchange of the transport.
#[derive(Debug, Clone)]
pub struct LoggingLayer {
    prefix: String,
}

impl LoggingLayer {
    /// Create a new logging layer
    pub fn new() -> Self {
        Self {
            prefix: "[Callwire]".to_string(),
        }
    }

    /// Create a logging layer with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: CallFactory> Layer<F> for LoggingLayer {
    type LayeredCallFactory = LoggingCallFactory<F>;

    fn layer(&self, inner: F) -> Self::LayeredCallFactory {
        LoggingCallFactory {
            inner,
            prefix: Arc::from(self.prefix.as_str()),
        }
    }
}

/// Transport wrapped with logging
#[derive(Debug)]
pub struct LoggingCallFactory<F> {
    inner: F,
    prefix: Arc<str>,
}

impl<F: CallFactory> LayeredCallFactory for LoggingCallFactory<F> {
    type Inner = F;

    fn inner(&self) -> &Self::Inner {
        &self.inner
    }

    fn layered_new_call(&self, request: Request) -> Result<Box<dyn RawCall>, CallError> {
        let method = request.method().clone();
        let url = request.url().clone();

        match self.inner.new_call(request) {
            Ok(inner) => Ok(Box::new(LoggingCall {
                inner,
                prefix: self.prefix.clone(),
            })),
            Err(e) => {
                tracing::error!("{} new_call error: {} {}: {:?}", self.prefix, method, url, e);
                Err(e)
            }
        }
    }
}

impl<F: CallFactory> CallFactory for LoggingCallFactory<F> {
    fn new_call(&self, request: Request) -> Result<Box<dyn RawCall>, CallError> {
        LayeredCallFactory::layered_new_call(self, request)
    }
}

/// Raw call wrapped with logging
#[derive(Debug)]
pub struct LoggingCall {
    inner: Box<dyn RawCall>,
    prefix: Arc<str>,
}

impl LoggingCall {
    fn log_outcome(
        prefix: &str,
        operation: &str,
        request: &Request,
        result: Result<&RawResponse, &CallError>,
        start: Instant,
    ) {
        let elapsed = start.elapsed();
        match result {
            Ok(response) => {
                tracing::debug!(
                    "{} {} success: {} {} -> {}, elapsed={:?}",
                    prefix,
                    operation,
                    request.method(),
                    request.url(),
                    response.status(),
                    elapsed
                );
            }
            Err(e) => {
                tracing::error!(
                    "{} {} error: {} {}: {:?}, elapsed={:?}",
                    prefix,
                    operation,
                    request.method(),
                    request.url(),
                    e,
                    elapsed
                );
            }
        }
    }
}

impl RawCall for LoggingCall {
    fn request(&self) -> &Request {
        self.inner.request()
    }

    fn execute(&self) -> Result<RawResponse, CallError> {
        let request = self.inner.request();
        tracing::debug!(
            "{} execute request: {} {}",
            self.prefix,
            request.method(),
            request.url()
        );

        let start = Instant::now();
        let result = self.inner.execute();
        Self::log_outcome(&self.prefix, "execute", request, result.as_ref(), start);
        result
    }

    fn enqueue(&self, callback: Box<dyn RawCallback>) {
        let request = self.inner.request();
        tracing::debug!(
            "{} enqueue request: {} {}",
            self.prefix,
            request.method(),
            request.url()
        );

        self.inner.enqueue(Box::new(LoggingCallback {
            inner: callback,
            prefix: self.prefix.clone(),
            request: request.clone(),
            start: Instant::now(),
        }));
    }

    fn cancel(&self) {
        tracing::debug!("{} cancel: {}", self.prefix, self.inner.request().url());
        self.inner.cancel()
    }

    fn is_canceled(&self) -> bool {
        self.inner.is_canceled()
    }
}

struct LoggingCallback {
    inner: Box<dyn RawCallback>,
    prefix: Arc<str>,
    request: Request,
    start: Instant,
}

impl RawCallback for LoggingCallback {
    fn on_response(self: Box<Self>, response: RawResponse) -> Result<(), CallError> {
        LoggingCall::log_outcome(&self.prefix, "enqueue", &self.request, Ok(&response), self.start);
        self.inner.on_response(response)
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        LoggingCall::log_outcome(&self.prefix, "enqueue", &self.request, Err(&error), self.start);
        self.inner.on_failure(error)
    }
}
