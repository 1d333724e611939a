//! Client implementation.
//!
//! The [`Client`] owns the transport and the ordered factory lists, and
//! caches one [`CallPlan`] per operation name.

use crate::adapter::{resolve_call_adapter, AnyCallAdapter, CallAdapterFactory, CallbackExecutor};
use crate::converter::{resolve_converter, AnyConverter, BuiltInConverters, ConverterFactory};
use crate::error::CallError;
use crate::layer::Layer;
use crate::plan::{CallPlan, MethodDeclaration, RequestTemplate};
use crate::platform::Platform;
use crate::reflect::TypeDescriptor;
use crate::transport::CallFactory;
use crate::types::Annotation;
use dashmap::DashMap;
use std::any::{type_name, Any};
use std::sync::Arc;

type CachedPlan = Arc<dyn Any + Send + Sync>;

/// Builder for composing a transport with layers, adapters and converters.
///
/// Layers wrap the transport with static dispatch; factories are collected
/// in the order they are added.
///
/// # Example
///
/// ```ignore
/// let client = Client::builder(transport)
///     .layer(LoggingLayer::new())
///     .converter_factory(Arc::new(JsonConverterFactory))
///     .call_adapter_factory(Arc::new(FutureCallAdapterFactory))
///     .finish();
/// ```
pub struct ClientBuilder<F> {
    factory: F,
    converter_factories: Vec<Arc<dyn ConverterFactory>>,
    call_adapter_factories: Vec<Arc<dyn CallAdapterFactory>>,
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
    platform: Platform,
}

impl<F: CallFactory> ClientBuilder<F> {
    /// Create a new builder with a transport
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            converter_factories: Vec::new(),
            call_adapter_factories: Vec::new(),
            callback_executor: None,
            platform: Platform::default(),
        }
    }

    /// Add a layer to wrap the transport
    ///
    /// Each call to `layer()` creates a new concrete type by wrapping the
    /// previous transport.
    pub fn layer<L>(self, layer: L) -> ClientBuilder<L::LayeredCallFactory>
    where
        L: Layer<F>,
    {
        ClientBuilder {
            factory: layer.layer(self.factory),
            converter_factories: self.converter_factories,
            call_adapter_factories: self.call_adapter_factories,
            callback_executor: self.callback_executor,
            platform: self.platform,
        }
    }

    /// Add a converter factory
    pub fn converter_factory(mut self, factory: Arc<dyn ConverterFactory>) -> Self {
        self.converter_factories.push(factory);
        self
    }

    /// Add a call adapter factory
    pub fn call_adapter_factory(mut self, factory: Arc<dyn CallAdapterFactory>) -> Self {
        self.call_adapter_factories.push(factory);
        self
    }

    /// Set the executor async callbacks are delivered on
    ///
    /// If not set, the platform default is used.
    pub fn callback_executor(mut self, executor: Arc<dyn CallbackExecutor>) -> Self {
        self.callback_executor = Some(executor);
        self
    }

    /// Set the platform providing defaults
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Finish building and create a Client
    pub fn finish(self) -> Client {
        let callback_executor = self
            .callback_executor
            .or_else(|| self.platform.default_callback_executor());

        let mut call_adapter_factories = self.call_adapter_factories;
        call_adapter_factories.extend(
            self.platform
                .default_call_adapter_factories(callback_executor.clone()),
        );

        // Built-ins go first so nothing can override the raw body behaviour.
        let mut converter_factories: Vec<Arc<dyn ConverterFactory>> =
            vec![Arc::new(BuiltInConverters)];
        converter_factories.extend(self.converter_factories);
        converter_factories.extend(self.platform.default_converter_factories());

        Client {
            factory: Arc::new(self.factory),
            converter_factories,
            call_adapter_factories,
            callback_executor,
            plans: DashMap::new(),
        }
    }
}

/// Entry point for declaring and invoking remote operations.
pub struct Client {
    factory: Arc<dyn CallFactory>,
    converter_factories: Vec<Arc<dyn ConverterFactory>>,
    call_adapter_factories: Vec<Arc<dyn CallAdapterFactory>>,
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
    plans: DashMap<String, CachedPlan>,
}

impl Client {
    /// Create a new builder
    pub fn builder<F: CallFactory>(factory: F) -> ClientBuilder<F> {
        ClientBuilder::new(factory)
    }

    /// The (layered) transport
    pub fn call_factory(&self) -> &Arc<dyn CallFactory> {
        &self.factory
    }

    pub fn converter_factories(&self) -> &[Arc<dyn ConverterFactory>] {
        &self.converter_factories
    }

    pub fn call_adapter_factories(&self) -> &[Arc<dyn CallAdapterFactory>] {
        &self.call_adapter_factories
    }

    pub fn callback_executor(&self) -> Option<&Arc<dyn CallbackExecutor>> {
        self.callback_executor.as_ref()
    }

    /// Get the plan for an operation, building it on first use.
    ///
    /// Plans are cached by operation name. A build failure is returned and
    /// not cached; asking again for the same name with different types is a
    /// configuration error.
    pub fn plan<A, T, R>(
        &self,
        declaration: &MethodDeclaration,
        template: Arc<dyn RequestTemplate<A>>,
    ) -> Result<Arc<CallPlan<A, T, R>>, CallError>
    where
        A: Send + Sync + 'static,
        T: Send + 'static,
        R: 'static,
    {
        let cached = self
            .plans
            .get(declaration.name())
            .map(|entry| entry.value().clone());
        if let Some(cached) = cached {
            return downcast_plan(declaration, cached);
        }

        let plan = Arc::new(CallPlan::<A, T, R>::build(
            declaration,
            template,
            self.factory.clone(),
            &self.call_adapter_factories,
            &self.converter_factories,
        )?);
        tracing::debug!(
            method = declaration.name(),
            response_type = %plan.response_type(),
            "Built call plan"
        );

        // Another thread may have won the race; keep whichever landed first.
        let cached = self
            .plans
            .entry(declaration.name().to_string())
            .or_insert_with(|| plan as CachedPlan)
            .value()
            .clone();
        downcast_plan(declaration, cached)
    }

    /// Resolve the call adapter for a return type
    pub fn call_adapter(
        &self,
        return_type: &TypeDescriptor,
        annotations: &[Annotation],
    ) -> Result<AnyCallAdapter, CallError> {
        resolve_call_adapter(&self.call_adapter_factories, return_type, annotations)
            .map_err(CallError::other)
    }

    /// Resolve the response body converter for a body type
    pub fn response_body_converter(
        &self,
        ty: &TypeDescriptor,
        annotations: &[Annotation],
    ) -> Result<AnyConverter, CallError> {
        resolve_converter(&self.converter_factories, ty, annotations).map_err(CallError::other)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("factory", &self.factory)
            .field("converter_factories", &self.converter_factories)
            .field("call_adapter_factories", &self.call_adapter_factories)
            .field("plans", &self.plans.len())
            .finish()
    }
}

fn downcast_plan<A, T, R>(
    declaration: &MethodDeclaration,
    cached: CachedPlan,
) -> Result<Arc<CallPlan<A, T, R>>, CallError>
where
    A: Send + Sync + 'static,
    T: Send + 'static,
    R: 'static,
{
    cached.downcast::<CallPlan<A, T, R>>().map_err(|_| {
        CallError::configuration(
            declaration.name(),
            format!(
                "Operation is already planned with different types than ({}, {}, {})",
                type_name::<A>(),
                type_name::<T>(),
                type_name::<R>()
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::DefaultCallAdapterFactory;
    use crate::body::ResponseBody;
    use crate::call::Call;
    use crate::plan::FnTemplate;
    use crate::reflect::Reflect;
    use crate::testing::{request, MockCallFactory};
    use reqwest::Method;

    #[derive(Debug)]
    struct Inline;

    impl CallbackExecutor for Inline {
        fn execute(&self, task: Box<dyn FnOnce() + Send>) {
            task()
        }
    }

    fn template() -> Arc<dyn RequestTemplate<()>> {
        Arc::new(FnTemplate::new(Method::GET, |_: &()| Ok(request())))
    }

    fn names<F: ?Sized>(factories: &[Arc<F>], name: impl Fn(&F) -> &str) -> Vec<String> {
        factories.iter().map(|f| name(&**f).to_string()).collect()
    }

    #[test]
    fn test_factory_order() {
        let client = Client::builder(MockCallFactory::respond(200, "{}"))
            .converter_factory(Arc::new(BuiltInConverters))
            .call_adapter_factory(Arc::new(DefaultCallAdapterFactory))
            .finish();

        assert_eq!(
            names(client.converter_factories(), |f| f.name()),
            ["builtin", "builtin"]
        );
        assert_eq!(
            names(client.call_adapter_factories(), |f| f.name()),
            ["default", "default"]
        );
        assert!(client.callback_executor().is_none());
    }

    #[test]
    fn test_platform_executor_is_used() {
        let client = Client::builder(MockCallFactory::respond(200, "{}"))
            .platform(Platform::new().with_callback_executor(Arc::new(Inline)))
            .finish();

        assert!(client.callback_executor().is_some());
        assert_eq!(
            names(client.call_adapter_factories(), |f| f.name()),
            ["executor"]
        );
    }

    #[test]
    fn test_plans_are_cached_by_name() {
        let factory = MockCallFactory::respond(200, "ok");
        let client = Client::builder(factory.clone()).finish();
        let declaration = MethodDeclaration::new::<Box<dyn Call<ResponseBody>>>("download");

        let first = client
            .plan::<(), ResponseBody, Box<dyn Call<ResponseBody>>>(&declaration, template())
            .unwrap();
        let second = client
            .plan::<(), ResponseBody, Box<dyn Call<ResponseBody>>>(&declaration, template())
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let mut body = first.invoke(()).execute().unwrap().into_body().unwrap();
        assert_eq!(body.text().unwrap(), "ok");
        assert_eq!(factory.exchanges(), 1);

        let err = client
            .plan::<(), (), Box<dyn Call<()>>>(&declaration, template())
            .unwrap_err();
        assert!(matches!(err, CallError::Configuration { .. }));
    }

    #[test]
    fn test_build_failures_are_not_cached() {
        let client = Client::builder(MockCallFactory::respond(200, "{}")).finish();
        let declaration = MethodDeclaration::new::<Box<dyn Call<String>>>("get_name");

        assert!(client
            .plan::<(), String, Box<dyn Call<String>>>(&declaration, template())
            .is_err());
        assert!(client.plans.is_empty());
    }

    #[test]
    fn test_resolution_helpers() {
        let client = Client::builder(MockCallFactory::respond(200, "{}")).finish();

        let adapter = client
            .call_adapter(&<Box<dyn Call<()>>>::descriptor(), &[])
            .unwrap();
        assert!(adapter.response_type().is_unit());

        assert!(client
            .response_body_converter(&ResponseBody::descriptor(), &[])
            .is_ok());
        let err = client
            .response_body_converter(&String::descriptor(), &[])
            .unwrap_err();
        assert!(err.to_string().contains("Could not locate ResponseBody converter"));
    }
}
