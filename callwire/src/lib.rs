//! # Callwire
//!
//! Typed HTTP calls for Rust, in the style of Retrofit.
//!
//! An operation is declared once: a name, a return type and a request
//! template. The [`Client`] turns each declaration into a [`CallPlan`] by
//! choosing a call adapter for the return type and a converter for the
//! response body. Invoking the plan yields the adapted value: a
//! [`Call`] to execute or enqueue, a future, or a blocking outcome.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! callwire = { version = "0.1", features = ["full"] }
//! ```
//!
//! ```ignore
//! use callwire::prelude::*;
//!
//! #[derive(Debug, serde::Deserialize)]
//! struct User {
//!     id: u32,
//!     login: String,
//! }
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder(ReqwestCallFactory::new()?)
//!     .layer(LoggingLayer::new())
//!     .converter_factory(Arc::new(JsonConverterFactory))
//!     .call_adapter_factory(Arc::new(FutureCallAdapterFactory))
//!     .finish();
//!
//! let get_user = client.plan::<u32, Json<User>, BodyFuture<Json<User>>>(
//!     &MethodDeclaration::new::<BodyFuture<Json<User>>>("get_user"),
//!     Arc::new(FnTemplate::new(Method::GET, |id: &u32| {
//!         Request::parse(Method::GET, &format!("https://api.example.com/users/{id}"))
//!     })),
//! )?;
//!
//! let user = get_user.invoke(7).await?;
//! println!("{user:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: All features below
//! - `transport`: reqwest transport
//! - `layers`: Built-in transport layers (logging)
//! - `adapters`: Future and blocking call adapters, tokio callback executor
//! - `converters`: JSON and scalar converters
//! - `full`: All features enabled

// Re-export core types and traits
pub use callwire_core::*;

// Re-export transports under `transport` module
#[cfg(feature = "callwire-transport")]
pub mod transport {
    //! HTTP transport implementations.
    pub use callwire_core::transport::*;
    pub use callwire_transport::*;
}

// Re-export layers under `layer` module
#[cfg(feature = "callwire-layer")]
pub mod layer {
    //! Built-in transport layers.
    pub use callwire_core::layer::*;
    pub use callwire_layer::*;
}

// Re-export adapters under `adapter` module
#[cfg(feature = "callwire-adapter")]
pub mod adapter {
    //! Call adapters and callback executors.
    pub use callwire_adapter::*;
    pub use callwire_core::adapter::*;
}

// Re-export converters under `converter` module
#[cfg(feature = "callwire-converter")]
pub mod converter {
    //! Response body converters.
    pub use callwire_converter::*;
    pub use callwire_core::converter::*;
}

// HTTP vocabulary used by requests and responses
pub use reqwest::{header, Method, StatusCode, Url};

/// Prelude module for convenient imports
pub mod prelude {
    //! Prelude module containing the most commonly used types and traits.
    //!
    //! ```
    //! use callwire::prelude::*;
    //! ```

    pub use crate::{
        callback, Call, CallError, CallPlan, Client, FnTemplate, Layer, Method,
        MethodDeclaration, Reflect, Request, Response, ResponseBody, Result, StatusCode,
    };
    pub use std::sync::Arc;

    #[cfg(feature = "callwire-transport")]
    pub use callwire_transport::{ReqwestCallFactory, ReqwestBuilder};

    #[cfg(feature = "callwire-layer")]
    pub use callwire_layer::LoggingLayer;

    #[cfg(feature = "callwire-adapter")]
    pub use callwire_adapter::{
        Blocking, BlockingCallAdapterFactory, BodyFuture, FutureCallAdapterFactory,
        ResponseFuture, TokioCallbackExecutor,
    };

    #[cfg(feature = "callwire-converter")]
    pub use callwire_converter::{Json, JsonConverterFactory, ScalarsConverterFactory};
}
