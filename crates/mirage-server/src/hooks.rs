//! Per-route hooks that post-process or replace the resolved body.

use crate::error::panic_message;
use hyper::{HeaderMap, Method, Uri};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Failure raised by a hook. The message becomes the `error` of the response.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Request data visible to a hook.
#[derive(Debug, Clone)]
pub struct HookRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Values bound to the route's `{name}` placeholders
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

/// A caller-supplied transform applied to the resolved sample.
///
/// Hooks may also edit the outgoing response headers.
pub trait Hook: Send + Sync {
    fn call(
        &self,
        sample: Value,
        request: &HookRequest,
        response: &mut HeaderMap,
    ) -> Result<Value, HookError>;
}

impl<F> Hook for F
where
    F: Fn(Value, &HookRequest, &mut HeaderMap) -> Result<Value, HookError> + Send + Sync,
{
    fn call(
        &self,
        sample: Value,
        request: &HookRequest,
        response: &mut HeaderMap,
    ) -> Result<Value, HookError> {
        self(sample, request, response)
    }
}

/// Route template → lowercase method → hook.
#[derive(Clone, Default)]
pub struct HookMap {
    hooks: HashMap<String, HashMap<String, Arc<dyn Hook>>>,
}

impl HookMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for a route template (`/pets/{id}`) and method.
    pub fn insert(&mut self, route: impl Into<String>, method: &str, hook: impl Hook + 'static) {
        self.hooks
            .entry(route.into())
            .or_default()
            .insert(method.to_ascii_lowercase(), Arc::new(hook));
    }

    pub fn with(mut self, route: impl Into<String>, method: &str, hook: impl Hook + 'static) -> Self {
        self.insert(route, method, hook);
        self
    }

    pub fn get(&self, route: &str, method: &str) -> Option<Arc<dyn Hook>> {
        self.hooks
            .get(route)?
            .get(&method.to_ascii_lowercase())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.hooks.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for HookMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes: Vec<(&String, Vec<&String>)> = self
            .hooks
            .iter()
            .map(|(route, methods)| (route, methods.keys().collect()))
            .collect();
        f.debug_struct("HookMap").field("routes", &routes).finish()
    }
}

/// Run a hook, turning both returned errors and panics into [`HookError`].
pub fn invoke(
    hook: &dyn Hook,
    sample: Value,
    request: &HookRequest,
    response: &mut HeaderMap,
) -> Result<Value, HookError> {
    match catch_unwind(AssertUnwindSafe(|| hook.call(sample, request, response))) {
        Ok(result) => result,
        Err(panic) => {
            let message =
                panic_message(panic.as_ref()).unwrap_or_else(|| "hook panicked".to_string());
            Err(HookError::new(message))
        }
    }
}
