//! Call adapters.
//!
//! A call adapter turns the `Box<dyn Call<T>>` produced for each invocation
//! into the return type the operation declares: the call itself, a future,
//! a blocking result and so on. Adapters are selected once per operation by
//! querying [`CallAdapterFactory`]s in order.

use crate::call::{contain, Call, Callback};
use crate::error::CallError;
use crate::reflect::{Reflect, TypeDescriptor};
use crate::response::Response;
use crate::types::{Annotation, Request};
use std::any::Any;
use std::fmt::{self, Debug, Write};
use std::marker::PhantomData;
use std::sync::Arc;

/// Adapts a call producing `T` into a value of type `R`.
pub trait CallAdapter<T, R>: Send + Sync {
    /// The body type the converter must produce
    fn response_type(&self) -> &TypeDescriptor;

    /// Adapt a fresh call; the adapter may drive it at most once
    fn adapt(&self, call: Box<dyn Call<T>>) -> R;
}

/// Type-erased call adapter produced by a [`CallAdapterFactory`].
#[derive(Clone)]
pub struct AnyCallAdapter {
    response_type: TypeDescriptor,
    adapter: Arc<dyn Any + Send + Sync>,
}

impl AnyCallAdapter {
    /// Erase an adapter from `Call<T>` to `R`
    pub fn new<T: 'static, R: 'static>(adapter: impl CallAdapter<T, R> + 'static) -> Self {
        let response_type = adapter.response_type().clone();
        let adapter: Arc<dyn CallAdapter<T, R>> = Arc::new(adapter);
        Self {
            response_type,
            adapter: Arc::new(adapter),
        }
    }

    pub fn response_type(&self) -> &TypeDescriptor {
        &self.response_type
    }

    /// Recover the adapter if it maps `Call<T>` to `R`
    pub fn downcast<T: 'static, R: 'static>(&self) -> Option<Arc<dyn CallAdapter<T, R>>> {
        self.adapter
            .as_ref()
            .downcast_ref::<Arc<dyn CallAdapter<T, R>>>()
            .cloned()
    }
}

impl Debug for AnyCallAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyCallAdapter")
            .field("response_type", &self.response_type)
            .finish()
    }
}

/// Produces call adapters for the return types it understands.
pub trait CallAdapterFactory: Send + Sync + Debug + 'static {
    /// Factory name for diagnostics
    fn name(&self) -> &str;

    /// Adapter for operations returning `return_type`, or `None` to decline
    fn get(&self, return_type: &TypeDescriptor, annotations: &[Annotation])
        -> Option<AnyCallAdapter>;
}

/// Query factories in order; the first one that does not decline wins.
pub fn resolve_call_adapter(
    factories: &[Arc<dyn CallAdapterFactory>],
    return_type: &TypeDescriptor,
    annotations: &[Annotation],
) -> Result<AnyCallAdapter, String> {
    if let Some(adapter) = factories
        .iter()
        .find_map(|f| f.get(return_type, annotations))
    {
        return Ok(adapter);
    }

    let mut message = format!("Could not locate call adapter for {return_type}.\n  Tried:");
    for factory in factories {
        let _ = write!(message, "\n   * {}", factory.name());
    }
    Err(message)
}

/// Runs callback deliveries, typically on a dedicated thread or runtime.
pub trait CallbackExecutor: Send + Sync + Debug + 'static {
    fn execute(&self, task: Box<dyn FnOnce() + Send>);
}

/// Type data attached to `Box<dyn Call<T>>` descriptors.
///
/// Holds adapter constructors monomorphized for `T`, so the built-in
/// factories can serve any response type without knowing it statically.
#[derive(Clone, Copy)]
pub struct CallTypeData {
    direct: fn(TypeDescriptor) -> AnyCallAdapter,
    dispatching: fn(TypeDescriptor, Arc<dyn CallbackExecutor>) -> AnyCallAdapter,
}

impl CallTypeData {
    pub fn of<T: Send + 'static>() -> Self {
        Self {
            direct: |response_type| AnyCallAdapter::new(DefaultCallAdapter::<T>::new(response_type)),
            dispatching: |response_type, executor| {
                AnyCallAdapter::new(ExecutorCallAdapter::<T> {
                    response_type,
                    executor,
                    _marker: PhantomData,
                })
            },
        }
    }
}

impl<T: Reflect + Send> Reflect for Box<dyn Call<T>> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .with_arg(T::descriptor())
            .with_data(CallTypeData::of::<T>())
    }
}

/// Adapter that hands out the call itself.
pub struct DefaultCallAdapter<T> {
    response_type: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DefaultCallAdapter<T> {
    pub fn new(response_type: TypeDescriptor) -> Self {
        Self {
            response_type,
            _marker: PhantomData,
        }
    }
}

impl<T> CallAdapter<T, Box<dyn Call<T>>> for DefaultCallAdapter<T> {
    fn response_type(&self) -> &TypeDescriptor {
        &self.response_type
    }

    fn adapt(&self, call: Box<dyn Call<T>>) -> Box<dyn Call<T>> {
        call
    }
}

/// Serves `Box<dyn Call<T>>` return types with the call itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCallAdapterFactory;

impl CallAdapterFactory for DefaultCallAdapterFactory {
    fn name(&self) -> &str {
        "default"
    }

    fn get(
        &self,
        return_type: &TypeDescriptor,
        _annotations: &[Annotation],
    ) -> Option<AnyCallAdapter> {
        let data = return_type.data::<CallTypeData>()?;
        let response_type = return_type.arg(0)?.clone();
        Some((data.direct)(response_type))
    }
}

/// Serves `Box<dyn Call<T>>` return types with calls whose async callbacks
/// run on a [`CallbackExecutor`].
///
/// Operations annotated with [`Annotation::SKIP_CALLBACK_EXECUTOR`] get the
/// plain call.
#[derive(Debug, Clone)]
pub struct ExecutorCallAdapterFactory {
    executor: Arc<dyn CallbackExecutor>,
}

impl ExecutorCallAdapterFactory {
    pub fn new(executor: Arc<dyn CallbackExecutor>) -> Self {
        Self { executor }
    }
}

impl CallAdapterFactory for ExecutorCallAdapterFactory {
    fn name(&self) -> &str {
        "executor"
    }

    fn get(
        &self,
        return_type: &TypeDescriptor,
        annotations: &[Annotation],
    ) -> Option<AnyCallAdapter> {
        let data = return_type.data::<CallTypeData>()?;
        let response_type = return_type.arg(0)?.clone();
        if Annotation::SKIP_CALLBACK_EXECUTOR.is_present(annotations) {
            return Some((data.direct)(response_type));
        }
        Some((data.dispatching)(response_type, self.executor.clone()))
    }
}

struct ExecutorCallAdapter<T> {
    response_type: TypeDescriptor,
    executor: Arc<dyn CallbackExecutor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> CallAdapter<T, Box<dyn Call<T>>> for ExecutorCallAdapter<T> {
    fn response_type(&self) -> &TypeDescriptor {
        &self.response_type
    }

    fn adapt(&self, call: Box<dyn Call<T>>) -> Box<dyn Call<T>> {
        Box::new(ExecutorCallbackCall {
            executor: self.executor.clone(),
            delegate: Arc::from(call),
        })
    }
}

/// Call whose async outcome is delivered through a callback executor.
///
/// Synchronous execution and cancellation go straight to the delegate. A
/// result the delegate already produced is always delivered, even if the
/// call is canceled while it waits on the executor.
pub struct ExecutorCallbackCall<T> {
    executor: Arc<dyn CallbackExecutor>,
    delegate: Arc<dyn Call<T>>,
}

impl<T: Send + 'static> Call<T> for ExecutorCallbackCall<T> {
    fn execute(&self) -> Result<Response<T>, CallError> {
        self.delegate.execute()
    }

    fn enqueue(&self, callback: Box<dyn Callback<T>>) -> Result<(), CallError> {
        self.delegate.enqueue(Box::new(Redispatch {
            executor: self.executor.clone(),
            callback,
        }))
    }

    fn cancel(&self) {
        self.delegate.cancel()
    }

    fn is_canceled(&self) -> bool {
        self.delegate.is_canceled()
    }

    fn is_executed(&self) -> bool {
        self.delegate.is_executed()
    }

    fn clone_call(&self) -> Box<dyn Call<T>> {
        Box::new(ExecutorCallbackCall {
            executor: self.executor.clone(),
            delegate: Arc::from(self.delegate.clone_call()),
        })
    }

    fn request(&self) -> Result<Request, CallError> {
        self.delegate.request()
    }
}

struct Redispatch<T> {
    executor: Arc<dyn CallbackExecutor>,
    callback: Box<dyn Callback<T>>,
}

impl<T: Send + 'static> Callback<T> for Redispatch<T> {
    fn on_response(self: Box<Self>, response: Response<T>) {
        let callback = self.callback;
        self.executor.execute(Box::new(move || {
            contain("on_response", move || callback.on_response(response))
        }));
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        let callback = self.callback;
        self.executor.execute(Box::new(move || {
            contain("on_failure", move || callback.on_failure(error))
        }));
    }
}
