//! # Callwire Core
//!
//! Call plans and the invocation engine for typed HTTP calls in Rust.
//!
//! An operation is declared once as a [`MethodDeclaration`] plus a
//! [`RequestTemplate`]. The [`Client`] turns that into a [`CallPlan`] by
//! picking a call adapter and a response converter, and every invocation of
//! the plan yields a fresh single-use [`Call`] that can be executed
//! synchronously, enqueued, or canceled from any thread.

pub mod adapter;
pub mod body;
pub mod call;
pub mod converter;
pub mod error;
pub mod layer;
pub mod plan;
pub mod platform;
pub mod reflect;
pub mod response;
pub mod runtime;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports
pub use adapter::{
    AnyCallAdapter, CallAdapter, CallAdapterFactory, CallbackExecutor, DefaultCallAdapterFactory,
    ExecutorCallAdapterFactory,
};
pub use body::ResponseBody;
pub use call::{callback, Call, Callback, HttpCall};
pub use converter::{AnyConverter, BuiltInConverters, Converter, ConverterFactory};
pub use error::CallError;
pub use layer::{Layer, LayeredCallFactory};
pub use plan::{CallPlan, FnTemplate, MethodDeclaration, RequestTemplate};
pub use platform::Platform;
pub use reflect::{Reflect, TypeDescriptor, TypeKind};
pub use response::{parse_response, Response};
pub use runtime::{Client, ClientBuilder};
pub use transport::{CallFactory, RawCall, RawCallback};
pub use types::*;

/// Result type alias for call operations
pub type Result<T> = std::result::Result<T, CallError>;
