//! Scripted transport and body fixtures for unit tests.

use crate::body::ResponseBody;
use crate::error::CallError;
use crate::transport::{CallFactory, RawCall, RawCallback};
use crate::types::{RawResponse, Request};
use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// `GET http://localhost/users/7`
pub(crate) fn request() -> Request {
    Request::parse(Method::GET, "http://localhost/users/7").unwrap()
}

/// Observes whether a reader handed to a body was dropped.
#[derive(Clone, Default)]
pub(crate) struct DropFlag(Arc<AtomicBool>);

impl DropFlag {
    pub(crate) fn reader(&self, data: &'static [u8]) -> impl Read + Send + 'static {
        FlaggedReader {
            inner: Cursor::new(data),
            flag: self.0.clone(),
        }
    }

    pub(crate) fn is_dropped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct FlaggedReader {
    inner: Cursor<&'static [u8]>,
    flag: Arc<AtomicBool>,
}

impl Read for FlaggedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for FlaggedReader {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Yields some bytes, then fails with a connection reset.
pub(crate) struct FailingReader {
    data: Cursor<Vec<u8>>,
}

impl FailingReader {
    pub(crate) fn after(data: &[u8]) -> Self {
        Self {
            data: Cursor::new(data.to_vec()),
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            n => Ok(n),
        }
    }
}

type Script = dyn Fn(&Request) -> Result<RawResponse, CallError> + Send + Sync;

#[derive(Default)]
struct Stats {
    creation_attempts: AtomicUsize,
    created: AtomicUsize,
    exchanges: AtomicUsize,
    canceled: AtomicUsize,
    fatal: AtomicUsize,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Transport whose exchanges are answered by a script.
///
/// `enqueue` runs on a fresh thread; [`MockCallFactory::join`] waits for all
/// of them.
#[derive(Clone)]
pub(crate) struct MockCallFactory {
    script: Arc<Script>,
    creation_failure: Option<CallError>,
    stats: Arc<Stats>,
}

impl MockCallFactory {
    pub(crate) fn new(
        script: impl Fn(&Request) -> Result<RawResponse, CallError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Arc::new(script),
            creation_failure: None,
            stats: Arc::default(),
        }
    }

    /// Answer every exchange with `status` and a JSON body
    pub(crate) fn respond(status: u16, body: &'static str) -> Self {
        Self::new(move |request| {
            let status = StatusCode::from_u16(status).map_err(|e| CallError::other(e.to_string()))?;
            Ok(RawResponse::new(request.clone(), status).with_body(ResponseBody::new(
                Some("application/json".into()),
                Some(body.len() as u64),
                Cursor::new(body.as_bytes()),
            )))
        })
    }

    /// Fail every `new_call` with `error`
    pub(crate) fn fail_creation(mut self, error: CallError) -> Self {
        self.creation_failure = Some(error);
        self
    }

    pub(crate) fn creation_attempts(&self) -> usize {
        self.stats.creation_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn created(&self) -> usize {
        self.stats.created.load(Ordering::SeqCst)
    }

    pub(crate) fn exchanges(&self) -> usize {
        self.stats.exchanges.load(Ordering::SeqCst)
    }

    /// Raw calls that were canceled at least once
    pub(crate) fn canceled(&self) -> usize {
        self.stats.canceled.load(Ordering::SeqCst)
    }

    /// Fatal errors returned to the transport by raw callbacks
    pub(crate) fn fatal_errors(&self) -> usize {
        self.stats.fatal.load(Ordering::SeqCst)
    }

    /// Wait for every enqueued exchange; returns how many worker threads panicked
    pub(crate) fn join(&self) -> usize {
        let workers: Vec<_> = self.stats.workers.lock().drain(..).collect();
        workers
            .into_iter()
            .map(JoinHandle::join)
            .filter(Result::is_err)
            .count()
    }
}

impl fmt::Debug for MockCallFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockCallFactory")
            .field("created", &self.created())
            .field("exchanges", &self.exchanges())
            .finish()
    }
}

impl CallFactory for MockCallFactory {
    fn new_call(&self, request: Request) -> Result<Box<dyn RawCall>, CallError> {
        self.stats.creation_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.creation_failure {
            return Err(error.clone());
        }
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCall(Arc::new(MockCallInner {
            request,
            script: self.script.clone(),
            stats: self.stats.clone(),
            canceled: AtomicBool::new(false),
        }))))
    }
}

struct MockCallInner {
    request: Request,
    script: Arc<Script>,
    stats: Arc<Stats>,
    canceled: AtomicBool,
}

impl MockCallInner {
    fn run(&self) -> Result<RawResponse, CallError> {
        if self.canceled.load(Ordering::SeqCst) {
            return Err(CallError::Canceled);
        }
        self.stats.exchanges.fetch_add(1, Ordering::SeqCst);
        (self.script)(&self.request)
    }
}

struct MockCall(Arc<MockCallInner>);

impl fmt::Debug for MockCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MockCall").field(self.0.request.url()).finish()
    }
}

impl RawCall for MockCall {
    fn request(&self) -> &Request {
        &self.0.request
    }

    fn execute(&self) -> Result<RawResponse, CallError> {
        self.0.run()
    }

    fn enqueue(&self, callback: Box<dyn RawCallback>) {
        let inner = self.0.clone();
        let worker = std::thread::spawn(move || match inner.run() {
            Ok(response) => {
                if callback.on_response(response).is_err() {
                    inner.stats.fatal.fetch_add(1, Ordering::SeqCst);
                }
            }
            Err(error) => callback.on_failure(error),
        });
        self.0.stats.workers.lock().push(worker);
    }

    fn cancel(&self) {
        if !self.0.canceled.swap(true, Ordering::SeqCst) {
            self.0.stats.canceled.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_canceled(&self) -> bool {
        self.0.canceled.load(Ordering::SeqCst)
    }
}
