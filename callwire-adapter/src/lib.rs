//! # Callwire Adapters
//!
//! Call adapters and callback executors for Callwire.
//!
//! - `FutureCallAdapterFactory`: operations returning `ResponseFuture<T>` or `BodyFuture<T>`
//! - `BlockingCallAdapterFactory`: operations returning `Blocking<T>`
//! - `TokioCallbackExecutor`: delivers async callbacks on a tokio runtime

pub mod blocking;
pub mod executor;
pub mod future;

#[cfg(test)]
mod stub;

// Re-exports
pub use blocking::{Blocking, BlockingCallAdapterFactory};
pub use executor::TokioCallbackExecutor;
pub use future::{BodyFuture, FutureCallAdapterFactory, ResponseFuture};
