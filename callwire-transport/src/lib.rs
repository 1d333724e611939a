//! # Callwire Transport
//!
//! Transport implementations for Callwire.

pub mod http;

// Re-exports
pub use http::{ReqwestBuilder, ReqwestCall, ReqwestCallFactory};

use callwire_core::error::CallError;
use std::time::Duration;

/// Create a reqwest transport on the current tokio runtime with a timeout
///
/// # Example
///
/// ```ignore
/// use callwire_transport::with_timeout;
///
/// let transport = with_timeout(Duration::from_secs(10))?;
/// ```
pub fn with_timeout(timeout: Duration) -> Result<ReqwestCallFactory, CallError> {
    ReqwestCallFactory::builder().timeout(timeout).build()
}
