//! Future adapters.
//!
//! [`ResponseFuture`] resolves to the full [`Response`]; [`BodyFuture`]
//! resolves to the body alone and turns non-2xx responses into
//! [`CallError::Http`]. Both are lazy: the call is enqueued on first poll,
//! and dropping the future while it waits cancels the call.

use callwire_core::adapter::{AnyCallAdapter, CallAdapter, CallAdapterFactory};
use callwire_core::call::{Call, Callback};
use callwire_core::error::CallError;
use callwire_core::reflect::{Reflect, TypeDescriptor};
use callwire_core::response::Response;
use callwire_core::types::Annotation;
use futures::channel::oneshot;
use futures::ready;
use pin_project::pin_project;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

type Outcome<T> = Result<Response<T>, CallError>;

/// Future resolving to the response of a call.
#[must_use = "futures do nothing unless polled"]
pub struct ResponseFuture<T> {
    call: Box<dyn Call<T>>,
    receiver: Option<oneshot::Receiver<Outcome<T>>>,
    finished: bool,
}

impl<T: Send + 'static> ResponseFuture<T> {
    pub fn new(call: Box<dyn Call<T>>) -> Self {
        Self {
            call,
            receiver: None,
            finished: false,
        }
    }

    /// The underlying call
    pub fn call(&self) -> &dyn Call<T> {
        self.call.as_ref()
    }
}

impl<T: Send + 'static> Future for ResponseFuture<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        let receiver = match this.receiver.take() {
            Some(receiver) => receiver,
            None => {
                let (tx, rx) = oneshot::channel();
                if let Err(e) = this.call.enqueue(Box::new(Completion(tx))) {
                    this.finished = true;
                    return Poll::Ready(Err(e));
                }
                rx
            }
        };
        let receiver = this.receiver.insert(receiver);

        let outcome = ready!(Pin::new(receiver).poll(cx));
        this.finished = true;
        Poll::Ready(outcome.unwrap_or_else(|_| {
            Err(CallError::illegal_state(
                "Call completed without notifying its callback",
            ))
        }))
    }
}

impl<T> Drop for ResponseFuture<T> {
    fn drop(&mut self) {
        if self.receiver.is_some() && !self.finished {
            self.call.cancel();
        }
    }
}

struct Completion<T>(oneshot::Sender<Outcome<T>>);

impl<T: Send> Callback<T> for Completion<T> {
    fn on_response(self: Box<Self>, response: Response<T>) {
        let _ = self.0.send(Ok(response));
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        let _ = self.0.send(Err(error));
    }
}

/// Future resolving to the body of a successful response.
///
/// The body is `None` for 204 and 205 responses.
#[pin_project]
#[must_use = "futures do nothing unless polled"]
pub struct BodyFuture<T> {
    #[pin]
    inner: ResponseFuture<T>,
}

impl<T: Send + 'static> BodyFuture<T> {
    pub fn new(call: Box<dyn Call<T>>) -> Self {
        Self {
            inner: ResponseFuture::new(call),
        }
    }
}

impl<T: Send + 'static> Future for BodyFuture<T> {
    type Output = Result<Option<T>, CallError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let mut response = ready!(this.inner.poll(cx))?;

        if response.is_successful() {
            return Poll::Ready(Ok(response.into_body()));
        }

        let status = response.status();
        let message = response
            .error_body_mut()
            .and_then(|body| body.text().ok())
            .unwrap_or_default();
        Poll::Ready(Err(CallError::http(status, message)))
    }
}

/// Type data attached to future descriptors.
#[derive(Clone, Copy)]
pub struct FutureTypeData {
    adapter: fn(TypeDescriptor) -> AnyCallAdapter,
}

impl<T: Reflect + Send> Reflect for ResponseFuture<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .with_arg(T::descriptor())
            .with_data(FutureTypeData {
                adapter: |response_type| {
                    AnyCallAdapter::new(FutureAdapter::<T, ResponseFuture<T>> {
                        response_type,
                        wrap: ResponseFuture::new,
                        _marker: PhantomData,
                    })
                },
            })
    }
}

impl<T: Reflect + Send> Reflect for BodyFuture<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .with_arg(T::descriptor())
            .with_data(FutureTypeData {
                adapter: |response_type| {
                    AnyCallAdapter::new(FutureAdapter::<T, BodyFuture<T>> {
                        response_type,
                        wrap: BodyFuture::new,
                        _marker: PhantomData,
                    })
                },
            })
    }
}

struct FutureAdapter<T, R> {
    response_type: TypeDescriptor,
    wrap: fn(Box<dyn Call<T>>) -> R,
    _marker: PhantomData<fn() -> T>,
}

impl<T, R> CallAdapter<T, R> for FutureAdapter<T, R> {
    fn response_type(&self) -> &TypeDescriptor {
        &self.response_type
    }

    fn adapt(&self, call: Box<dyn Call<T>>) -> R {
        (self.wrap)(call)
    }
}

/// Serves [`ResponseFuture`] and [`BodyFuture`] return types.
#[derive(Debug, Clone, Copy, Default)]
pub struct FutureCallAdapterFactory;

impl CallAdapterFactory for FutureCallAdapterFactory {
    fn name(&self) -> &str {
        "future"
    }

    fn get(
        &self,
        return_type: &TypeDescriptor,
        _annotations: &[Annotation],
    ) -> Option<AnyCallAdapter> {
        let data = return_type.data::<FutureTypeData>()?;
        let response_type = return_type.arg(0)?.clone();
        Some((data.adapter)(response_type))
    }
}
