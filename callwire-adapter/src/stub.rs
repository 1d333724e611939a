//! In-memory transport for adapter tests.

use callwire_core::body::ResponseBody;
use callwire_core::error::CallError;
use callwire_core::transport::{CallFactory, RawCall, RawCallback};
use callwire_core::types::{RawResponse, Request};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Answers with a fixed status and text body, or never answers until canceled.
#[derive(Debug, Clone)]
pub(crate) struct Stub {
    status: StatusCode,
    body: &'static str,
    hang: bool,
    exchanges: Arc<AtomicUsize>,
    canceled: Arc<AtomicUsize>,
}

impl Stub {
    pub(crate) fn respond(status: u16, body: &'static str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body,
            hang: false,
            exchanges: Arc::default(),
            canceled: Arc::default(),
        }
    }

    pub(crate) fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::respond(200, "")
        }
    }

    pub(crate) fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub(crate) fn canceled(&self) -> usize {
        self.canceled.load(Ordering::SeqCst)
    }

    fn response(&self, request: &Request) -> RawResponse {
        RawResponse::new(request.clone(), self.status).with_body(ResponseBody::from_bytes(
            Some("text/plain".into()),
            self.body,
        ))
    }
}

impl CallFactory for Stub {
    fn new_call(&self, request: Request) -> Result<Box<dyn RawCall>, CallError> {
        Ok(Box::new(StubCall {
            request,
            stub: self.clone(),
            canceled: Arc::new(AtomicBool::new(false)),
        }))
    }
}

#[derive(Debug)]
struct StubCall {
    request: Request,
    stub: Stub,
    canceled: Arc<AtomicBool>,
}

impl RawCall for StubCall {
    fn request(&self) -> &Request {
        &self.request
    }

    fn execute(&self) -> Result<RawResponse, CallError> {
        if self.canceled.load(Ordering::SeqCst) {
            return Err(CallError::Canceled);
        }
        self.stub.exchanges.fetch_add(1, Ordering::SeqCst);
        Ok(self.stub.response(&self.request))
    }

    fn enqueue(&self, callback: Box<dyn RawCallback>) {
        self.stub.exchanges.fetch_add(1, Ordering::SeqCst);
        let response = self.stub.response(&self.request);
        let canceled = self.canceled.clone();
        let hang = self.stub.hang;

        thread::spawn(move || {
            while hang && !canceled.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            if canceled.load(Ordering::SeqCst) {
                callback.on_failure(CallError::Canceled);
            } else {
                let _ = callback.on_response(response);
            }
        });
    }

    fn cancel(&self) {
        if !self.canceled.swap(true, Ordering::SeqCst) {
            self.stub.canceled.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}
