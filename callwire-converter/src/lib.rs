//! # Callwire Converters
//!
//! Response body converters for Callwire.
//!
//! - `JsonConverterFactory`: bodies declared as [`Json<T>`], decoded with `serde_json`
//! - `ScalarsConverterFactory`: `String`, `bool` and numeric bodies parsed from text

pub mod json;
pub mod scalars;

// Re-exports
pub use json::{Json, JsonConverterFactory};
pub use scalars::ScalarsConverterFactory;
