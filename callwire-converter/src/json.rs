//! JSON bodies via `serde_json`.

use callwire_core::body::ResponseBody;
use callwire_core::converter::{AnyConverter, Converter, ConverterFactory};
use callwire_core::error::CallError;
use callwire_core::reflect::{Reflect, TypeDescriptor};
use callwire_core::types::Annotation;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// A response body decoded from JSON.
///
/// Declare `Json<T>` as the response type of an operation to have its body
/// deserialized into `T`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

#[derive(Clone, Copy)]
struct JsonCodec {
    make: fn() -> AnyConverter,
}

impl<T> Reflect for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .with_arg(TypeDescriptor::of::<T>())
            .with_data(JsonCodec {
                make: || AnyConverter::new(JsonConverter::<T>(PhantomData)),
            })
    }
}

struct JsonConverter<T>(PhantomData<fn() -> T>);

impl<T: DeserializeOwned> Converter<Json<T>> for JsonConverter<T> {
    fn convert(&self, body: ResponseBody) -> Result<Json<T>, CallError> {
        let reader = body.into_reader()?;
        Ok(Json(serde_json::from_reader(reader)?))
    }
}

/// Serves [`Json`] response types.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverterFactory;

impl JsonConverterFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ConverterFactory for JsonConverterFactory {
    fn name(&self) -> &str {
        "json"
    }

    fn response_body_converter(
        &self,
        ty: &TypeDescriptor,
        _annotations: &[Annotation],
    ) -> Option<AnyConverter> {
        ty.data::<JsonCodec>().map(|codec| (codec.make)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callwire_core::response::parse_response;
    use callwire_core::types::{RawResponse, Request};
    use reqwest::{Method, StatusCode};
    use serde::Deserialize;
    use std::io::{self, Cursor, Read};
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        id: u32,
        #[serde(default)]
        name: Option<String>,
    }

    fn converter<T: DeserializeOwned + Send + 'static>() -> Arc<dyn Converter<Json<T>>> {
        JsonConverterFactory
            .response_body_converter(&Json::<T>::descriptor(), &[])
            .unwrap()
            .downcast::<Json<T>>()
            .unwrap()
    }

    fn raw(status: u16, body: ResponseBody) -> RawResponse {
        let request = Request::parse(Method::GET, "http://localhost/users/7").unwrap();
        RawResponse::new(request, StatusCode::from_u16(status).unwrap()).with_body(body)
    }

    #[test]
    fn test_decodes_success_body() {
        let body = ResponseBody::from_bytes(Some("application/json".into()), r#"{"id":7}"#);
        let response = parse_response(raw(200, body), converter::<User>().as_ref()).unwrap();

        let user = response.into_body().unwrap().into_inner();
        assert_eq!(user, User { id: 7, name: None });
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let body = ResponseBody::from_bytes(None, "{\"id\":");
        let err = converter::<User>().convert(body).unwrap_err();
        assert!(matches!(err, CallError::Serialization(_)));
    }

    struct Reset;

    impl Read for Reset {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_source_failure_outranks_decoding() {
        let body = ResponseBody::new(None, None, Cursor::new(b"{\"id\":7,".to_vec()).chain(Reset));
        let err = parse_response(raw(200, body), converter::<User>().as_ref()).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_declines_undecorated_types() {
        assert!(JsonConverterFactory
            .response_body_converter(&String::descriptor(), &[])
            .is_none());
        assert!(JsonConverterFactory
            .response_body_converter(&Json::<serde_json::Value>::descriptor(), &[])
            .is_some());
    }
}
