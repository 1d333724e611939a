//! HTTP transport backed by reqwest.
//!
//! Each raw call runs its exchange as a task on a tokio runtime. The whole
//! response body is read on that task, so converters later read from memory
//! and never block a runtime thread. A body that fails midway keeps the
//! bytes received so far and reports the failure when it is read.
//!
//! Bodies are not size-limited, and [`Annotation::STREAMING`] only skips the
//! second copy the built-in converter would make: the payload is already in
//! memory when classification starts. Use a transport that hands over the
//! live socket reader for bodies that must not be buffered.
//!
//! [`Annotation::STREAMING`]: callwire_core::types::Annotation::STREAMING

use bytes::{Bytes, BytesMut};
use callwire_core::body::ResponseBody;
use callwire_core::error::CallError;
use callwire_core::transport::{CallFactory, RawCall, RawCallback};
use callwire_core::types::{RawResponse, Request};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::future::Future;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};

/// Transport creating reqwest-backed raw calls
#[derive(Clone)]
pub struct ReqwestCallFactory {
    client: reqwest::Client,
    runtime: Handle,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ReqwestCallFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestCallFactory")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReqwestCallFactory {
    /// Create a transport with default configuration on the current runtime
    pub fn new() -> Result<Self, CallError> {
        Self::builder().build()
    }

    /// Create a builder for more configuration options
    pub fn builder() -> ReqwestBuilder {
        ReqwestBuilder::default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl CallFactory for ReqwestCallFactory {
    fn new_call(&self, request: Request) -> Result<Box<dyn RawCall>, CallError> {
        let (cancel, _) = watch::channel(false);
        Ok(Box::new(ReqwestCall {
            request,
            client: self.client.clone(),
            runtime: self.runtime.clone(),
            timeout: self.timeout,
            executed: AtomicBool::new(false),
            cancel,
        }))
    }
}

/// Builder for ReqwestCallFactory
#[derive(Default)]
pub struct ReqwestBuilder {
    client: Option<reqwest::Client>,
    runtime: Option<Handle>,
    timeout: Option<Duration>,
}

impl ReqwestBuilder {
    /// Use a preconfigured reqwest client
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Run exchanges on this runtime instead of the current one
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Per-request timeout covering the whole exchange
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the transport
    pub fn build(self) -> Result<ReqwestCallFactory, CallError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| {
                CallError::configuration(
                    "transport",
                    format!("No runtime handle configured and none is current: {e}"),
                )
            })?,
        };

        Ok(ReqwestCallFactory {
            client: self.client.unwrap_or_default(),
            runtime,
            timeout: self.timeout,
        })
    }
}

/// One reqwest exchange
pub struct ReqwestCall {
    request: Request,
    client: reqwest::Client,
    runtime: Handle,
    timeout: Option<Duration>,
    executed: AtomicBool,
    cancel: watch::Sender<bool>,
}

impl std::fmt::Debug for ReqwestCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestCall")
            .field("method", self.request.method())
            .field("url", &self.request.url().as_str())
            .field("executed", &self.executed.load(Ordering::Relaxed))
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

impl ReqwestCall {
    fn claim(&self) -> Result<(), CallError> {
        if self.executed.swap(true, Ordering::AcqRel) {
            return Err(CallError::AlreadyExecuted);
        }
        Ok(())
    }

    /// Build the exchange future; it owns everything it needs
    fn exchange(&self) -> impl Future<Output = Result<RawResponse, CallError>> + Send + 'static {
        let client = self.client.clone();
        let request = self.request.clone();
        let outgoing = to_reqwest(&self.request, self.timeout);
        let canceled = self.cancel.subscribe();

        async move {
            let send = async move {
                let response = client.execute(outgoing).await?;
                read_response(request, response).await
            };

            tokio::select! {
                biased;
                _ = wait_canceled(canceled) => Err(CallError::Canceled),
                result = send => result,
            }
        }
    }
}

impl RawCall for ReqwestCall {
    fn request(&self) -> &Request {
        &self.request
    }

    fn execute(&self) -> Result<RawResponse, CallError> {
        if Handle::try_current().is_ok() {
            return Err(CallError::illegal_state(
                "Blocking execute() called from inside an async runtime; use enqueue() instead",
            ));
        }
        self.claim()?;

        let (tx, rx) = oneshot::channel();
        let exchange = self.exchange();
        self.runtime.spawn(async move {
            let _ = tx.send(exchange.await);
        });

        rx.blocking_recv()
            .map_err(|_| CallError::other("Transport task ended without a result"))?
    }

    fn enqueue(&self, callback: Box<dyn RawCallback>) {
        if let Err(e) = self.claim() {
            callback.on_failure(e);
            return;
        }

        let exchange = self.exchange();
        let url = self.request.url().clone();
        self.runtime.spawn(async move {
            match exchange.await {
                Ok(response) => {
                    if let Err(e) = callback.on_response(response) {
                        tracing::error!(url = %url, error = %e, "Fatal error while delivering response");
                    }
                }
                Err(e) => callback.on_failure(e),
            }
        });
    }

    fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    fn is_canceled(&self) -> bool {
        *self.cancel.borrow()
    }
}

fn to_reqwest(request: &Request, timeout: Option<Duration>) -> reqwest::Request {
    let mut outgoing = reqwest::Request::new(request.method().clone(), request.url().clone());
    *outgoing.headers_mut() = request.headers().clone();
    *outgoing.timeout_mut() = timeout;

    if let Some(body) = request.body() {
        if let Some(content_type) = &body.content_type {
            if !outgoing.headers().contains_key(CONTENT_TYPE) {
                if let Ok(value) = HeaderValue::from_str(content_type) {
                    outgoing.headers_mut().insert(CONTENT_TYPE, value);
                }
            }
        }
        *outgoing.body_mut() = Some(body.bytes.clone().into());
    }
    outgoing
}

async fn wait_canceled(mut canceled: watch::Receiver<bool>) {
    loop {
        if *canceled.borrow_and_update() {
            return;
        }
        if canceled.changed().await.is_err() {
            // The call is gone, nobody can cancel any more.
            std::future::pending::<()>().await;
        }
    }
}

async fn read_response(
    request: Request,
    mut response: reqwest::Response,
) -> Result<RawResponse, CallError> {
    let status = response.status();
    let headers = response.headers().clone();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let content_length = response.content_length();

    let mut received = BytesMut::new();
    let failure = loop {
        match response.chunk().await {
            Ok(Some(chunk)) => received.extend_from_slice(&chunk),
            Ok(None) => break None,
            Err(e) => break Some(io::Error::new(io::ErrorKind::Other, e)),
        }
    };

    let body = ReceivedBody {
        data: Cursor::new(received.freeze()),
        failure,
    };
    Ok(RawResponse::new(request, status)
        .with_headers(headers)
        .with_body(ResponseBody::new(content_type, content_length, body)))
}

/// Bytes read off the wire, followed by the failure that ended the read, if any
struct ReceivedBody {
    data: Cursor<Bytes>,
    failure: Option<io::Error>,
}

impl Read for ReceivedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read(buf)?;
        if n > 0 || buf.is_empty() {
            return Ok(n);
        }
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(0),
        }
    }
}
