//! Blocking adapter: the call runs while it is being adapted.

use callwire_core::adapter::{AnyCallAdapter, CallAdapter, CallAdapterFactory};
use callwire_core::call::Call;
use callwire_core::error::CallError;
use callwire_core::reflect::{Reflect, TypeDescriptor};
use callwire_core::response::Response;
use callwire_core::types::Annotation;
use std::marker::PhantomData;

/// Outcome of a call executed on the invoking thread.
#[derive(Debug)]
pub struct Blocking<T>(Result<Response<T>, CallError>);

impl<T> Blocking<T> {
    pub fn into_result(self) -> Result<Response<T>, CallError> {
        self.0
    }

    /// The body of a successful response, or the error for anything else
    pub fn into_body(self) -> Result<Option<T>, CallError> {
        let mut response = self.0?;
        if response.is_successful() {
            return Ok(response.into_body());
        }
        let status = response.status();
        let message = response
            .error_body_mut()
            .and_then(|body| body.text().ok())
            .unwrap_or_default();
        Err(CallError::http(status, message))
    }

    pub fn is_ok(&self) -> bool {
        self.0.is_ok()
    }
}

#[derive(Clone, Copy)]
struct BlockingTypeData {
    adapter: fn(TypeDescriptor) -> AnyCallAdapter,
}

impl<T: Reflect + Send> Reflect for Blocking<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .with_arg(T::descriptor())
            .with_data(BlockingTypeData {
                adapter: |response_type| {
                    AnyCallAdapter::new(BlockingAdapter::<T> {
                        response_type,
                        _marker: PhantomData,
                    })
                },
            })
    }
}

struct BlockingAdapter<T> {
    response_type: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CallAdapter<T, Blocking<T>> for BlockingAdapter<T> {
    fn response_type(&self) -> &TypeDescriptor {
        &self.response_type
    }

    fn adapt(&self, call: Box<dyn Call<T>>) -> Blocking<T> {
        Blocking(call.execute())
    }
}

/// Serves [`Blocking`] return types.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingCallAdapterFactory;

impl CallAdapterFactory for BlockingCallAdapterFactory {
    fn name(&self) -> &str {
        "blocking"
    }

    fn get(
        &self,
        return_type: &TypeDescriptor,
        _annotations: &[Annotation],
    ) -> Option<AnyCallAdapter> {
        let data = return_type.data::<BlockingTypeData>()?;
        let response_type = return_type.arg(0)?.clone();
        Some((data.adapter)(response_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::Stub;
    use callwire_core::body::ResponseBody;
    use callwire_core::plan::{FnTemplate, MethodDeclaration};
    use callwire_core::runtime::Client;
    use callwire_core::types::Request;
    use reqwest::{Method, StatusCode};
    use std::sync::Arc;

    fn client(stub: &Stub) -> Client {
        Client::builder(stub.clone())
            .call_adapter_factory(Arc::new(BlockingCallAdapterFactory))
            .finish()
    }

    #[test]
    fn test_call_runs_during_invoke() {
        let stub = Stub::respond(200, "pong");
        let plan = client(&stub)
            .plan::<(), ResponseBody, Blocking<ResponseBody>>(
                &MethodDeclaration::new::<Blocking<ResponseBody>>("ping"),
                Arc::new(FnTemplate::new(Method::GET, |_: &()| {
                    Request::parse(Method::GET, "http://localhost/ping")
                })),
            )
            .unwrap();

        let outcome = plan.invoke(());
        assert_eq!(stub.exchanges(), 1);
        assert!(outcome.is_ok());

        let response = outcome.into_result().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.into_body().unwrap().text().unwrap(), "pong");
    }

    #[test]
    fn test_into_body_reports_http_errors() {
        let stub = Stub::respond(503, "down for maintenance");
        let plan = client(&stub)
            .plan::<(), (), Blocking<()>>(
                &MethodDeclaration::new::<Blocking<()>>("ping"),
                Arc::new(FnTemplate::new(Method::GET, |_: &()| {
                    Request::parse(Method::GET, "http://localhost/ping")
                })),
            )
            .unwrap();

        let err = plan.invoke(()).into_body().unwrap_err();
        assert_eq!(
            err.to_string(),
            "HTTP 503 Service Unavailable: down for maintenance"
        );
    }
}
