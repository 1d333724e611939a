//! # Callwire Layers
//!
//! Built-in transport layers for Callwire.
//!
//! Currently implemented layers:
//! - `LoggingLayer`: Logs every raw exchange with timing information
//!
//! ## Usage
//!
//! ```ignore
//! use callwire_core::Client;
//! use callwire_layer::LoggingLayer;
//!
//! let client = Client::builder(transport)
//!     .layer(LoggingLayer::with_prefix("[users]"))
//!     .finish();
//! ```

pub mod logging;

// Re-exports
pub use logging::{LoggingCall, LoggingCallFactory, LoggingLayer};
