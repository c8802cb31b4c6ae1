//! Route binding: turns the resource registry into a dispatchable route table.
//!
//! For every `(route, method)` pair the binder converts the path template,
//! computes the status keys and default status, looks up the hook, and registers
//! an immutable [`RouteConfig`] under the converted path. Binding runs once,
//! before the server accepts connections.

mod method;
mod path;

pub use method::{HttpMethod, MethodRoutes};
pub use path::{display_path, param_names, to_route_pattern};

use crate::activity::{StartupLogger, BOLD, CYAN, GREEN, RESET};
use crate::hooks::{Hook, HookMap};
use crate::registry::{Registry, StatusMap};
use matchit::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bind-time options supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct BindOptions {
    /// Status allowlist applied to every route instead of its declared keys
    pub statuses: Option<Vec<String>>,
    /// Serve literal examples instead of generated values by default
    pub force_example: bool,
}

/// Immutable configuration of one bound route and method.
#[derive(Clone)]
pub struct RouteConfig {
    /// Route template as declared (`/pets/{id}`)
    pub path: String,
    /// Router pattern the handler is registered under
    pub pattern: String,
    pub method: HttpMethod,
    pub responses: StatusMap,
    pub status_keys: Vec<String>,
    /// `None` only when `status_keys` is empty
    pub default_status: Option<String>,
    pub hook: Option<Arc<dyn Hook>>,
    pub force_example: bool,
}

impl std::fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteConfig")
            .field("path", &self.path)
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .field("status_keys", &self.status_keys)
            .field("default_status", &self.default_status)
            .field("hook", &self.hook.is_some())
            .field("force_example", &self.force_example)
            .finish()
    }
}

#[cfg(test)]
impl RouteConfig {
    pub(crate) fn for_test(path: &str, method: HttpMethod) -> Self {
        Self {
            path: path.to_string(),
            pattern: to_route_pattern(path),
            method,
            responses: StatusMap::new(),
            status_keys: Vec::new(),
            default_status: None,
            hook: None,
            force_example: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("Unsupported method '{method}' for {route}")]
    UnsupportedMethod { route: String, method: String },
    #[error("Method {method} declared twice for {route}")]
    DuplicateMethod { route: String, method: String },
    #[error("Invalid route {route}: {message}")]
    InvalidRoute { route: String, message: String },
}

/// Status keys for a route: the allowlist when given, else the declared keys.
pub fn status_keys(declared: &StatusMap, allowlist: Option<&[String]>) -> Vec<String> {
    match allowlist {
        Some(allowed) => allowed.to_vec(),
        None => declared.keys().cloned().collect(),
    }
}

/// First key in `[200, 400)`, else the first key.
pub fn default_status(keys: &[String]) -> Option<String> {
    keys.iter()
        .find(|key| {
            key.trim()
                .parse::<u16>()
                .map(|code| (200..400).contains(&code))
                .unwrap_or(false)
        })
        .or_else(|| keys.first())
        .cloned()
}

/// Percent-decode a path parameter, keeping the raw text if it is not UTF-8.
fn decode_param(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Bound routes, ready for dispatch.
pub struct RouteTable {
    router: Router<MethodRoutes>,
    patterns: Vec<String>,
    bound: usize,
}

impl RouteTable {
    /// Find the method table and path parameters for a request path.
    ///
    /// A single trailing slash is optional. Parameter values are percent-decoded.
    pub fn lookup(&self, path: &str) -> Option<(&MethodRoutes, HashMap<String, String>)> {
        let matched = self.router.at(path).ok().or_else(|| {
            let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty())?;
            self.router.at(trimmed).ok()
        })?;
        let params = matched
            .params
            .iter()
            .map(|(name, value)| (name.to_string(), decode_param(value)))
            .collect();
        Some((matched.value, params))
    }

    /// Router patterns in registration order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Number of bound route/method pairs.
    pub fn len(&self) -> usize {
        self.bound
    }

    pub fn is_empty(&self) -> bool {
        self.bound == 0
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("patterns", &self.patterns)
            .field("bound", &self.bound)
            .finish()
    }
}

pub struct RouteBinder<'a> {
    registry: &'a Registry,
    options: &'a BindOptions,
    hooks: &'a HookMap,
}

impl<'a> RouteBinder<'a> {
    pub fn new(registry: &'a Registry, options: &'a BindOptions, hooks: &'a HookMap) -> Self {
        Self {
            registry,
            options,
            hooks,
        }
    }

    /// Bind every resource, logging one line per route and per method.
    pub fn bind(&self, log: &mut StartupLogger) -> Result<RouteTable, BindError> {
        let mut router = Router::new();
        let mut patterns = Vec::new();
        let mut bound = 0;

        log.log("Resources:");

        for (route, methods) in self.registry.resources() {
            let pattern = to_route_pattern(route);
            log.log(format!("  {GREEN}{}{RESET}", display_path(route)));

            let mut table = MethodRoutes::default();
            for (declared_method, responses) in methods {
                let method = HttpMethod::parse(declared_method).ok_or_else(|| {
                    BindError::UnsupportedMethod {
                        route: route.clone(),
                        method: declared_method.clone(),
                    }
                })?;

                let config = self.route_config(route, &pattern, method, declared_method, responses);
                log.log(format!(
                    "    {CYAN}{method}{RESET} -> {}",
                    summarize_statuses(&config.status_keys, config.default_status.as_deref())
                ));
                if config.status_keys.is_empty() {
                    warn!("{} {} declares no responses", method, route);
                }

                table.register(config)?;
                bound += 1;
            }

            router
                .insert(pattern.clone(), table)
                .map_err(|e| BindError::InvalidRoute {
                    route: route.clone(),
                    message: e.to_string(),
                })?;
            debug!(
                "Bound {} as {} with params {:?}",
                route,
                pattern,
                param_names(route)
            );
            patterns.push(pattern);
        }

        Ok(RouteTable {
            router,
            patterns,
            bound,
        })
    }

    fn route_config(
        &self,
        route: &str,
        pattern: &str,
        method: HttpMethod,
        declared_method: &str,
        responses: &StatusMap,
    ) -> RouteConfig {
        let status_keys = status_keys(responses, self.options.statuses.as_deref());
        let default_status = default_status(&status_keys);

        RouteConfig {
            path: route.to_string(),
            pattern: pattern.to_string(),
            method,
            responses: responses.clone(),
            status_keys,
            default_status,
            hook: self.hooks.get(route, declared_method),
            force_example: self.options.force_example,
        }
    }
}

/// `200, 404` with the default rendered bold.
fn summarize_statuses(keys: &[String], default: Option<&str>) -> String {
    keys.iter()
        .map(|key| {
            if Some(key.as_str()) == default {
                format!("{BOLD}{key}{RESET}")
            } else {
                key.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
