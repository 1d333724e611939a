//! Plain-text scalar bodies.

use callwire_core::body::ResponseBody;
use callwire_core::converter::{AnyConverter, ConverterFactory};
use callwire_core::error::CallError;
use callwire_core::reflect::TypeDescriptor;
use callwire_core::types::Annotation;
use std::any::type_name;
use std::fmt::Display;
use std::str::FromStr;

/// Serves `String`, `bool` and numeric response types.
///
/// Numbers and booleans are parsed from the trimmed body text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarsConverterFactory;

impl ScalarsConverterFactory {
    pub fn new() -> Self {
        Self
    }
}

fn parsed<T>() -> AnyConverter
where
    T: FromStr + 'static,
    T::Err: Display,
{
    AnyConverter::new(|mut body: ResponseBody| -> Result<T, CallError> {
        let text = body.text()?;
        text.trim().parse::<T>().map_err(|e| {
            CallError::conversion(format!(
                "Cannot read {} from body {:?}: {}",
                type_name::<T>(),
                text,
                e
            ))
        })
    })
}

impl ConverterFactory for ScalarsConverterFactory {
    fn name(&self) -> &str {
        "scalars"
    }

    fn response_body_converter(
        &self,
        ty: &TypeDescriptor,
        _annotations: &[Annotation],
    ) -> Option<AnyConverter> {
        if ty.is::<String>() {
            return Some(AnyConverter::new(
                |mut body: ResponseBody| -> Result<String, CallError> { body.text() },
            ));
        }

        let converter = if ty.is::<bool>() {
            parsed::<bool>()
        } else if ty.is::<i32>() {
            parsed::<i32>()
        } else if ty.is::<i64>() {
            parsed::<i64>()
        } else if ty.is::<u32>() {
            parsed::<u32>()
        } else if ty.is::<u64>() {
            parsed::<u64>()
        } else if ty.is::<f32>() {
            parsed::<f32>()
        } else if ty.is::<f64>() {
            parsed::<f64>()
        } else {
            return None;
        };
        Some(converter)
    }
}
