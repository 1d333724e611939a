//! Response body converters and their factories.

use crate::body::ResponseBody;
use crate::error::CallError;
use crate::reflect::TypeDescriptor;
use crate::types::Annotation;
use std::any::Any;
use std::fmt::{Debug, Write};
use std::sync::Arc;

/// Turns a response body into a typed value.
pub trait Converter<T>: Send + Sync {
    /// Convert the body; dropping it closes the underlying source
    fn convert(&self, body: ResponseBody) -> Result<T, CallError>;
}

impl<T, F> Converter<T> for F
where
    F: Fn(ResponseBody) -> Result<T, CallError> + Send + Sync,
{
    fn convert(&self, body: ResponseBody) -> Result<T, CallError> {
        self(body)
    }
}

/// Type-erased converter produced by a [`ConverterFactory`].
#[derive(Clone)]
pub struct AnyConverter(Arc<dyn Any + Send + Sync>);

impl AnyConverter {
    /// Erase a converter producing `T`
    pub fn new<T: 'static>(converter: impl Converter<T> + 'static) -> Self {
        let converter: Arc<dyn Converter<T>> = Arc::new(converter);
        Self(Arc::new(converter))
    }

    /// Recover the converter if it produces `T`
    pub fn downcast<T: 'static>(&self) -> Option<Arc<dyn Converter<T>>> {
        self.0.as_ref().downcast_ref::<Arc<dyn Converter<T>>>().cloned()
    }
}

impl Debug for AnyConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AnyConverter")
    }
}

/// Produces converters for the types it understands.
pub trait ConverterFactory: Send + Sync + Debug + 'static {
    /// Factory name for diagnostics
    fn name(&self) -> &str;

    /// Converter for response bodies of type `ty`, or `None` to decline
    fn response_body_converter(
        &self,
        ty: &TypeDescriptor,
        annotations: &[Annotation],
    ) -> Option<AnyConverter>;
}

/// Query factories in order; the first one that does not decline wins.
pub fn resolve_converter(
    factories: &[Arc<dyn ConverterFactory>],
    ty: &TypeDescriptor,
    annotations: &[Annotation],
) -> Result<AnyConverter, String> {
    if let Some(converter) = factories
        .iter()
        .find_map(|f| f.response_body_converter(ty, annotations))
    {
        return Ok(converter);
    }

    let mut message = format!("Could not locate ResponseBody converter for {ty}.\n  Tried:");
    for factory in factories {
        let _ = write!(message, "\n   * {}", factory.name());
    }
    Err(message)
}

/// Converters that need no configuration: raw bodies and `()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltInConverters;

impl ConverterFactory for BuiltInConverters {
    fn name(&self) -> &str {
        "builtin"
    }

    fn response_body_converter(
        &self,
        ty: &TypeDescriptor,
        annotations: &[Annotation],
    ) -> Option<AnyConverter> {
        if ty.is::<ResponseBody>() {
            return Some(if Annotation::STREAMING.is_present(annotations) {
                AnyConverter::new(|body: ResponseBody| -> Result<ResponseBody, CallError> {
                    Ok(body)
                })
            } else {
                // Buffer so the value outlives the connection.
                AnyConverter::new(|body: ResponseBody| -> Result<ResponseBody, CallError> {
                    body.buffer()
                })
            });
        }
        if ty.is_unit() {
            return Some(AnyConverter::new(
                |_body: ResponseBody| -> Result<(), CallError> { Ok(()) },
            ));
        }
        None
    }
}
