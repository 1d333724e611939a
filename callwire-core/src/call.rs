//! Per-invocation execution engine.
//!
//! An [`HttpCall`] captures the arguments of one invocation and lazily turns
//! them into a transport [`RawCall`]. It is single-use: the first `execute`
//! or `enqueue` claims it, every later attempt fails with
//! [`CallError::AlreadyExecuted`]. Use [`Call::clone_call`] to retry.

use crate::converter::Converter;
use crate::error::CallError;
use crate::plan::RequestTemplate;
use crate::response::{parse_response, Response};
use crate::transport::{CallFactory, RawCall, RawCallback};
use crate::types::{RawResponse, Request};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// An invocation of a remote operation that yields a [`Response<T>`].
pub trait Call<T>: Send + Sync {
    /// Send the request and block until the response is classified
    fn execute(&self) -> Result<Response<T>, CallError>;

    /// Send the request asynchronously and notify `callback` exactly once.
    ///
    /// Returns an error only when the call was already executed or a fatal
    /// error occurred; every other failure goes to the callback.
    fn enqueue(&self, callback: Box<dyn Callback<T>>) -> Result<(), CallError>;

    /// Cancel the call; safe from any thread, at any time
    fn cancel(&self);

    fn is_canceled(&self) -> bool;

    fn is_executed(&self) -> bool;

    /// A new, never executed call with the same operation and arguments
    fn clone_call(&self) -> Box<dyn Call<T>>;

    /// The request this call sends, creating it if needed
    fn request(&self) -> Result<Request, CallError>;
}

/// Receives the outcome of [`Call::enqueue`].
pub trait Callback<T>: Send {
    /// A response was received; it may still be an HTTP error
    fn on_response(self: Box<Self>, response: Response<T>);

    /// The request failed or its response could not be converted
    fn on_failure(self: Box<Self>, error: CallError);
}

/// Callback built from two closures.
pub struct FnCallback<S, F> {
    on_response: S,
    on_failure: F,
}

impl<T, S, F> Callback<T> for FnCallback<S, F>
where
    S: FnOnce(Response<T>) + Send,
    F: FnOnce(CallError) + Send,
{
    fn on_response(self: Box<Self>, response: Response<T>) {
        (self.on_response)(response)
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        (self.on_failure)(error)
    }
}

/// Create a boxed callback from closures
pub fn callback<T, S, F>(on_response: S, on_failure: F) -> Box<dyn Callback<T>>
where
    T: 'static,
    S: FnOnce(Response<T>) + Send + 'static,
    F: FnOnce(CallError) + Send + 'static,
{
    Box::new(FnCallback {
        on_response,
        on_failure,
    })
}

#[derive(Default)]
struct CallState {
    executed: bool,
    raw: Option<Arc<dyn RawCall>>,
    creation_failure: Option<CallError>,
}

/// The engine behind every call produced by a call plan.
pub struct HttpCall<A, T> {
    id: Uuid,
    template: Arc<dyn RequestTemplate<A>>,
    args: Arc<A>,
    factory: Arc<dyn CallFactory>,
    converter: Arc<dyn Converter<T>>,
    canceled: AtomicBool,
    state: Mutex<CallState>,
}

impl<A, T> HttpCall<A, T>
where
    A: Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn new(
        template: Arc<dyn RequestTemplate<A>>,
        args: Arc<A>,
        factory: Arc<dyn CallFactory>,
        converter: Arc<dyn Converter<T>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            template,
            args,
            factory,
            converter,
            canceled: AtomicBool::new(false),
            state: Mutex::new(CallState::default()),
        }
    }

    /// Identifier used in log events
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The captured arguments
    pub fn args(&self) -> &A {
        &self.args
    }

    /// Return the raw call, creating it on first use.
    ///
    /// A creation failure is remembered and replayed; fatal errors are not.
    fn raw_call(&self, state: &mut CallState) -> Result<Arc<dyn RawCall>, CallError> {
        if let Some(raw) = &state.raw {
            return Ok(raw.clone());
        }
        if let Some(failure) = &state.creation_failure {
            return Err(failure.clone());
        }

        let created = self
            .template
            .materialize(&self.args)
            .and_then(|request| self.factory.new_call(request));

        match created {
            Ok(raw) => {
                let raw: Arc<dyn RawCall> = Arc::from(raw);
                state.raw = Some(raw.clone());
                Ok(raw)
            }
            Err(e) => {
                if !e.is_fatal() {
                    tracing::debug!(call_id = %self.id, error = %e, "Call creation failed");
                    state.creation_failure = Some(e.clone());
                }
                Err(e)
            }
        }
    }

    /// Claim the call for its single run
    fn claim(&self) -> Result<Result<Arc<dyn RawCall>, CallError>, CallError> {
        let mut state = self.state.lock();
        if state.executed {
            return Err(CallError::AlreadyExecuted);
        }
        state.executed = true;
        Ok(self.raw_call(&mut state))
    }

    fn apply_pending_cancel(&self, raw: &dyn RawCall) {
        if self.canceled.load(Ordering::Acquire) {
            tracing::debug!(call_id = %self.id, "Canceling call before start");
            raw.cancel();
        }
    }
}

impl<A, T> Call<T> for HttpCall<A, T>
where
    A: Send + Sync + 'static,
    T: Send + 'static,
{
    fn execute(&self) -> Result<Response<T>, CallError> {
        let raw = self.claim()??;
        self.apply_pending_cancel(raw.as_ref());

        let response = raw.execute()?;
        parse_response(response, self.converter.as_ref())
    }

    fn enqueue(&self, callback: Box<dyn Callback<T>>) -> Result<(), CallError> {
        let raw = match self.claim()? {
            Ok(raw) => raw,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                deliver(self.id, "on_failure", move || callback.on_failure(e));
                return Ok(());
            }
        };
        self.apply_pending_cancel(raw.as_ref());

        raw.enqueue(Box::new(Dispatch {
            id: self.id,
            converter: self.converter.clone(),
            callback,
        }));
        Ok(())
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
        // Clone out so the transport is never called under the lock.
        let raw = self.state.lock().raw.clone();
        if let Some(raw) = raw {
            tracing::debug!(call_id = %self.id, "Canceling call");
            raw.cancel();
        }
    }

    fn is_canceled(&self) -> bool {
        if self.canceled.load(Ordering::Acquire) {
            return true;
        }
        self.state
            .lock()
            .raw
            .as_ref()
            .is_some_and(|raw| raw.is_canceled())
    }

    fn is_executed(&self) -> bool {
        self.state.lock().executed
    }

    fn clone_call(&self) -> Box<dyn Call<T>> {
        Box::new(HttpCall::new(
            self.template.clone(),
            self.args.clone(),
            self.factory.clone(),
            self.converter.clone(),
        ))
    }

    fn request(&self) -> Result<Request, CallError> {
        let mut state = self.state.lock();
        Ok(self.raw_call(&mut state)?.request().clone())
    }
}

impl<A, T> fmt::Debug for HttpCall<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HttpCall")
            .field("id", &self.id)
            .field("executed", &state.executed)
            .field("canceled", &self.canceled.load(Ordering::Relaxed))
            .field("raw", &state.raw)
            .finish()
    }
}

/// Raw callback that classifies the response before handing it on.
struct Dispatch<T> {
    id: Uuid,
    converter: Arc<dyn Converter<T>>,
    callback: Box<dyn Callback<T>>,
}

impl<T: 'static> RawCallback for Dispatch<T> {
    fn on_response(self: Box<Self>, raw: RawResponse) -> Result<(), CallError> {
        let Dispatch {
            id,
            converter,
            callback,
        } = *self;

        match parse_response(raw, converter.as_ref()) {
            Ok(response) => deliver(id, "on_response", move || callback.on_response(response)),
            Err(e) if e.is_fatal() => {
                // The caller hears about it too, but the transport still gets it back.
                let fatal = e.clone();
                deliver(id, "on_failure", move || callback.on_failure(fatal));
                return Err(e);
            }
            Err(e) => deliver(id, "on_failure", move || callback.on_failure(e)),
        }
        Ok(())
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        let Dispatch { id, callback, .. } = *self;
        deliver(id, "on_failure", move || callback.on_failure(error));
    }
}

fn deliver(id: Uuid, callback: &'static str, f: impl FnOnce()) {
    let _span = tracing::error_span!("call", id = %id).entered();
    contain(callback, f);
}

/// Run user callback code, logging a panic instead of unwinding into the
/// transport.
pub(crate) fn contain(callback: &'static str, f: impl FnOnce()) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(callback, panic = %message, "Callback panicked");
    }
}
