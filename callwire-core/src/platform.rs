//! Platform defaults.
//!
//! A [`Platform`] supplies the defaults a client falls back to when the user
//! does not configure them: the callback executor and the adapter and
//! converter factories appended after the user's own. It is passed in
//! explicitly; nothing here inspects the environment.

use crate::adapter::{
    CallAdapterFactory, CallbackExecutor, DefaultCallAdapterFactory, ExecutorCallAdapterFactory,
};
use crate::converter::ConverterFactory;
use std::sync::Arc;

/// Default collaborators for a client.
#[derive(Debug, Clone, Default)]
pub struct Platform {
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
}

impl Platform {
    /// A platform without a callback executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver async callbacks on `executor` unless the client overrides it
    pub fn with_callback_executor(mut self, executor: Arc<dyn CallbackExecutor>) -> Self {
        self.callback_executor = Some(executor);
        self
    }

    pub fn default_callback_executor(&self) -> Option<Arc<dyn CallbackExecutor>> {
        self.callback_executor.clone()
    }

    /// Adapter factories queried after the user's
    pub fn default_call_adapter_factories(
        &self,
        callback_executor: Option<Arc<dyn CallbackExecutor>>,
    ) -> Vec<Arc<dyn CallAdapterFactory>> {
        match callback_executor {
            Some(executor) => vec![Arc::new(ExecutorCallAdapterFactory::new(executor))],
            None => vec![Arc::new(DefaultCallAdapterFactory)],
        }
    }

    /// Converter factories queried after the user's
    pub fn default_converter_factories(&self) -> Vec<Arc<dyn ConverterFactory>> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inline;

    impl CallbackExecutor for Inline {
        fn execute(&self, task: Box<dyn FnOnce() + Send>) {
            task()
        }
    }

    #[test]
    fn test_adapter_defaults_follow_executor() {
        let platform = Platform::new();
        assert!(platform.default_callback_executor().is_none());

        let plain = platform.default_call_adapter_factories(None);
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].name(), "default");

        let platform = platform.with_callback_executor(Arc::new(Inline));
        let dispatching =
            platform.default_call_adapter_factories(platform.default_callback_executor());
        assert_eq!(dispatching[0].name(), "executor");
        assert!(platform.default_converter_factories().is_empty());
    }
}
