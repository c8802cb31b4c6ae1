//! Supported HTTP methods and the per-route method table.

use super::{BindError, RouteConfig};
use hyper::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// Parse a declared method name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(name))
    }

    pub fn from_hyper(method: &Method) -> Option<Self> {
        Self::parse(method.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handlers registered for one route pattern, keyed by method.
#[derive(Debug, Default, Clone)]
pub struct MethodRoutes {
    handlers: HashMap<HttpMethod, Arc<RouteConfig>>,
}

impl MethodRoutes {
    pub fn register(&mut self, config: RouteConfig) -> Result<(), BindError> {
        let method = config.method;
        if self.handlers.contains_key(&method) {
            return Err(BindError::DuplicateMethod {
                route: config.path.clone(),
                method: method.to_string(),
            });
        }
        self.handlers.insert(method, Arc::new(config));
        Ok(())
    }

    pub fn get(&self, method: HttpMethod) -> Option<&Arc<RouteConfig>> {
        self.handlers.get(&method)
    }

    pub fn contains(&self, method: HttpMethod) -> bool {
        self.handlers.contains_key(&method)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
