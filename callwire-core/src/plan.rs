//! Call plans.
//!
//! A [`CallPlan`] is built once per declared operation. Building it picks
//! exactly one call adapter and one response converter and validates the
//! declared types; a plan that builds is never partially configured. Each
//! [`CallPlan::invoke`] then creates a fresh [`HttpCall`] and adapts it.

use crate::adapter::{resolve_call_adapter, CallAdapter, CallAdapterFactory};
use crate::call::HttpCall;
use crate::converter::{resolve_converter, Converter, ConverterFactory};
use crate::error::CallError;
use crate::reflect::{Reflect, ResponseEnvelope, TypeDescriptor};
use crate::transport::CallFactory;
use crate::types::{Annotation, RawResponse, Request};
use reqwest::Method;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

/// Turns invocation arguments into a request.
pub trait RequestTemplate<A>: Send + Sync + 'static {
    /// HTTP method of every request this template produces
    fn method(&self) -> &Method;

    /// Build the request for one invocation
    fn materialize(&self, args: &A) -> Result<Request, CallError>;
}

/// Request template backed by a closure.
pub struct FnTemplate<F> {
    method: Method,
    build: F,
}

impl<F> FnTemplate<F> {
    pub fn new<A>(method: Method, build: F) -> Self
    where
        F: Fn(&A) -> Result<Request, CallError>,
    {
        Self { method, build }
    }
}

impl<A, F> RequestTemplate<A> for FnTemplate<F>
where
    F: Fn(&A) -> Result<Request, CallError> + Send + Sync + 'static,
{
    fn method(&self) -> &Method {
        &self.method
    }

    fn materialize(&self, args: &A) -> Result<Request, CallError> {
        (self.build)(args)
    }
}

/// Declared signature of one operation.
#[derive(Debug, Clone)]
pub struct MethodDeclaration {
    name: String,
    return_type: TypeDescriptor,
    annotations: Vec<Annotation>,
}

impl MethodDeclaration {
    /// Declare an operation returning `R`
    pub fn new<R: Reflect>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: R::descriptor(),
            annotations: Vec::new(),
        }
    }

    /// Override the declared return type
    pub fn with_return_type(mut self, return_type: TypeDescriptor) -> Self {
        self.return_type = return_type;
        self
    }

    /// Add an annotation
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// Immutable description of how to execute one operation.
///
/// `A` is the argument type, `T` the converted body type and `R` the type
/// the operation returns.
pub struct CallPlan<A, T, R> {
    name: String,
    response_type: TypeDescriptor,
    template: Arc<dyn RequestTemplate<A>>,
    factory: Arc<dyn CallFactory>,
    converter: Arc<dyn Converter<T>>,
    adapter: Arc<dyn CallAdapter<T, R>>,
}

impl<A, T, R> CallPlan<A, T, R>
where
    A: Send + Sync + 'static,
    T: Send + 'static,
    R: 'static,
{
    /// Build a plan, selecting the first adapter and converter that accept
    /// the declared types.
    pub fn build(
        declaration: &MethodDeclaration,
        template: Arc<dyn RequestTemplate<A>>,
        factory: Arc<dyn CallFactory>,
        adapter_factories: &[Arc<dyn CallAdapterFactory>],
        converter_factories: &[Arc<dyn ConverterFactory>],
    ) -> Result<Self, CallError> {
        let fail = |message: String| CallError::configuration(declaration.name(), message);
        let return_type = declaration.return_type();
        let annotations = declaration.annotations();

        if return_type.has_unresolvable() {
            return Err(fail(format!(
                "Method return type must not include a type variable or wildcard: {return_type}"
            )));
        }
        if return_type.is_unit() {
            return Err(fail("Service methods cannot return ().".to_string()));
        }
        if !return_type.is::<R>() {
            return Err(fail(format!(
                "Declared return type {return_type} does not match {}",
                type_name::<R>()
            )));
        }

        let adapter = resolve_call_adapter(adapter_factories, return_type, annotations)
            .map_err(|e| fail(format!("Unable to create call adapter for {return_type}\n{e}")))?;

        let response_type = adapter.response_type().clone();
        if response_type.is::<RawResponse>() || response_type.data::<ResponseEnvelope>().is_some() {
            return Err(fail(format!(
                "'{response_type}' is not a valid response body type. Did you mean ResponseBody?"
            )));
        }
        if template.method() == Method::HEAD && !response_type.is_unit() {
            return Err(fail("HEAD method must use () as response type.".to_string()));
        }

        let adapter = adapter.downcast::<T, R>().ok_or_else(|| {
            fail(format!(
                "Call adapter for {return_type} does not adapt calls of {} into {}",
                type_name::<T>(),
                type_name::<R>()
            ))
        })?;

        let converter = resolve_converter(converter_factories, &response_type, annotations)
            .map_err(|e| fail(format!("Unable to create converter for {response_type}\n{e}")))?
            .downcast::<T>()
            .ok_or_else(|| {
                fail(format!(
                    "Converter for {response_type} does not produce {}",
                    type_name::<T>()
                ))
            })?;

        Ok(Self {
            name: declaration.name().to_string(),
            response_type,
            template,
            factory,
            converter,
            adapter,
        })
    }

    /// Create a fresh call for `args` and adapt it
    pub fn invoke(&self, args: A) -> R {
        let call = HttpCall::new(
            self.template.clone(),
            Arc::new(args),
            self.factory.clone(),
            self.converter.clone(),
        );
        self.adapter.adapt(Box::new(call))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Body type produced by the converter
    pub fn response_type(&self) -> &TypeDescriptor {
        &self.response_type
    }

    pub fn method(&self) -> &Method {
        self.template.method()
    }
}

impl<A: 'static, T, R> fmt::Debug for CallPlan<A, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPlan")
            .field("name", &self.name)
            .field("method", self.template.method())
            .field("response_type", &self.response_type)
            .field("factory", &self.factory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::DefaultCallAdapterFactory;
    use crate::body::ResponseBody;
    use crate::call::Call;
    use crate::converter::{AnyConverter, BuiltInConverters};
    use crate::response::Response;
    use crate::testing::MockCallFactory;

    /// Reads `{"id": n}` documents into `u64`.
    #[derive(Debug)]
    struct IdConverterFactory;

    impl ConverterFactory for IdConverterFactory {
        fn name(&self) -> &str {
            "id"
        }

        fn response_body_converter(
            &self,
            ty: &TypeDescriptor,
            _annotations: &[Annotation],
        ) -> Option<AnyConverter> {
            if !ty.is::<u64>() {
                return None;
            }
            Some(AnyConverter::new(
                |mut body: ResponseBody| -> Result<u64, CallError> {
                    let value: serde_json::Value = serde_json::from_slice(&body.bytes()?)?;
                    value["id"]
                        .as_u64()
                        .ok_or_else(|| CallError::conversion("missing id"))
                },
            ))
        }
    }

    fn adapters() -> Vec<Arc<dyn CallAdapterFactory>> {
        vec![Arc::new(DefaultCallAdapterFactory)]
    }

    fn converters() -> Vec<Arc<dyn ConverterFactory>> {
        vec![Arc::new(BuiltInConverters), Arc::new(IdConverterFactory)]
    }

    fn template(method: Method) -> Arc<dyn RequestTemplate<u64>> {
        let verb = method.clone();
        Arc::new(FnTemplate::new(method, move |id: &u64| {
            Request::parse(verb.clone(), &format!("http://localhost/users/{id}"))
        }))
    }

    fn build<T, R>(declaration: &MethodDeclaration, method: Method) -> Result<CallPlan<u64, T, R>, CallError>
    where
        T: Send + 'static,
        R: 'static,
    {
        let factory = MockCallFactory::respond(200, r#"{"id":7}"#);
        CallPlan::build(
            declaration,
            template(method),
            Arc::new(factory),
            &adapters(),
            &converters(),
        )
    }

    fn message(err: CallError) -> String {
        match err {
            CallError::Configuration { method, message } => {
                assert_eq!(method, "get_user");
                message
            }
            other => panic!("Expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_invokes_fresh_calls() {
        let declaration = MethodDeclaration::new::<Box<dyn Call<u64>>>("get_user");
        let plan = build::<u64, Box<dyn Call<u64>>>(&declaration, Method::GET).unwrap();

        assert_eq!(plan.name(), "get_user");
        assert!(plan.response_type().is::<u64>());

        let first = plan.invoke(7);
        let second = plan.invoke(8);
        assert_eq!(first.execute().unwrap().body(), Some(&7));
        assert!(!second.is_executed());
        assert_eq!(second.request().unwrap().url().path(), "/users/8");
    }

    #[test]
    fn test_plan_debug_names_operation() {
        let declaration = MethodDeclaration::new::<Box<dyn Call<u64>>>("get_user");
        let plan = build::<u64, Box<dyn Call<u64>>>(&declaration, Method::GET).unwrap();

        let rendered = format!("{plan:?}");
        assert!(rendered.contains("get_user"));
        assert!(rendered.contains("GET"));
    }

    #[test]
    fn test_rejects_type_variable() {
        let declaration = MethodDeclaration::new::<Box<dyn Call<u64>>>("get_user").with_return_type(
            TypeDescriptor::variable("Call").with_arg(TypeDescriptor::variable("T")),
        );

        let err = build::<u64, Box<dyn Call<u64>>>(&declaration, Method::GET).unwrap_err();
        assert_eq!(
            message(err),
            "Method return type must not include a type variable or wildcard: Call<T>"
        );
    }

    #[test]
    fn test_rejects_unit_return() {
        let declaration = MethodDeclaration::new::<()>("get_user");

        let err = build::<(), ()>(&declaration, Method::GET).unwrap_err();
        assert_eq!(message(err), "Service methods cannot return ().");
    }

    #[test]
    fn test_rejects_mismatched_return_type() {
        let declaration = MethodDeclaration::new::<String>("get_user");

        let err = build::<u64, Box<dyn Call<u64>>>(&declaration, Method::GET).unwrap_err();
        assert!(message(err).starts_with("Declared return type alloc::string::String does not match"));
    }

    #[test]
    fn test_rejects_raw_response_body_types() {
        let declaration = MethodDeclaration::new::<Box<dyn Call<RawResponse>>>("get_user");
        let err =
            build::<RawResponse, Box<dyn Call<RawResponse>>>(&declaration, Method::GET).unwrap_err();
        assert!(message(err).ends_with("is not a valid response body type. Did you mean ResponseBody?"));

        let declaration = MethodDeclaration::new::<Box<dyn Call<Response<u64>>>>("get_user");
        let err = build::<Response<u64>, Box<dyn Call<Response<u64>>>>(&declaration, Method::GET)
            .unwrap_err();
        assert!(message(err).contains("Did you mean ResponseBody?"));
    }

    #[test]
    fn test_head_requires_unit_body() {
        let declaration = MethodDeclaration::new::<Box<dyn Call<u64>>>("get_user");
        let err = build::<u64, Box<dyn Call<u64>>>(&declaration, Method::HEAD).unwrap_err();
        assert_eq!(message(err), "HEAD method must use () as response type.");

        let declaration = MethodDeclaration::new::<Box<dyn Call<()>>>("get_user");
        let plan = build::<(), Box<dyn Call<()>>>(&declaration, Method::HEAD).unwrap();
        assert_eq!(plan.method(), Method::HEAD);
    }

    #[test]
    fn test_missing_converter_lists_factories() {
        let declaration = MethodDeclaration::new::<Box<dyn Call<String>>>("get_user");

        let err = build::<String, Box<dyn Call<String>>>(&declaration, Method::GET).unwrap_err();
        let message = message(err);
        assert!(message.contains("Could not locate ResponseBody converter for alloc::string::String."));
        assert!(message.contains("* builtin"));
        assert!(message.contains("* id"));
    }

    #[test]
    fn test_missing_adapter_is_reported() {
        let declaration = MethodDeclaration::new::<Box<dyn Call<u64>>>("get_user");
        let factory = MockCallFactory::respond(200, r#"{"id":7}"#);

        let err = CallPlan::<u64, u64, Box<dyn Call<u64>>>::build(
            &declaration,
            template(Method::GET),
            Arc::new(factory),
            &[],
            &converters(),
        )
        .unwrap_err();
        assert!(message(err).contains("Could not locate call adapter"));
    }
}
