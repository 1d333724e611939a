//! Callback executor backed by a tokio runtime.

use callwire_core::adapter::CallbackExecutor;
use callwire_core::error::CallError;
use tokio::runtime::Handle;

/// Delivers callbacks as tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioCallbackExecutor {
    handle: Handle,
}

impl TokioCallbackExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on
    pub fn current() -> Result<Self, CallError> {
        let handle = Handle::try_current()
            .map_err(|e| CallError::configuration("callback executor", e.to_string()))?;
        Ok(Self::new(handle))
    }
}

impl CallbackExecutor for TokioCallbackExecutor {
    fn execute(&self, task: Box<dyn FnOnce() + Send>) {
        self.handle.spawn(async move { task() });
    }
}
