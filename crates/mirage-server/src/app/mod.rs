//! The mock application: bound routes plus the request handler.
//!
//! [`MockApp::build`] runs the startup phase (bind, then flush the route log).
//! [`MockApp::handle`] answers one request: envelope headers first, then route
//! dispatch, resolution, and exactly one activity block.

mod response;
mod server;

#[cfg(test)]
mod tests;

pub use response::{
    build_response, envelope_headers, error_response, preflight_response, ErrorBody,
    ALLOW_HEADERS, ALLOW_METHODS, ALLOW_ORIGIN, EXPOSE_HEADERS, PREFLIGHT_METHODS,
};
pub use server::{base_url, bind_listener, serve, ServerHandle};

use crate::activity::{LogSink, RuntimeLogger, StartupLogger};
use crate::binder::{
    BindError, BindOptions, HttpMethod, MethodRoutes, RouteBinder, RouteConfig, RouteTable,
};
use crate::error::MockError;
use crate::hooks::HookMap;
use crate::registry::Registry;
use crate::resolver::{
    parse_query_string, request_url, resolve, IncomingRequest, ResolveContext,
};
use crate::schema::{RefTable, SchemaValueGenerator};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{HeaderMap, Method, Request, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Header a browser sends to list the headers it wants to use.
const REQUEST_HEADERS: &str = "access-control-request-headers";

pub struct MockApp {
    routes: RouteTable,
    context: ResolveContext,
    log: RuntimeLogger,
}

impl MockApp {
    /// Bind every resource and flush the route log to `sink` (`None` is silent).
    pub fn build(
        registry: Arc<Registry>,
        refs: Arc<RefTable>,
        generator: Arc<dyn SchemaValueGenerator>,
        options: &BindOptions,
        hooks: &HookMap,
        sink: Option<LogSink>,
    ) -> Result<Self, BindError> {
        let mut startup = StartupLogger::new();
        let routes = RouteBinder::new(&registry, options, hooks).bind(&mut startup)?;
        info!(
            "Bound {} route/method pairs across {} paths",
            routes.len(),
            routes.patterns().len()
        );
        let log = startup.flush(sink);

        Ok(Self {
            routes,
            context: ResolveContext::new(registry, refs, generator),
            log,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn logger(&self) -> &RuntimeLogger {
        &self.log
    }

    /// Answer one request. Never fails: every error becomes a 500 envelope.
    pub fn handle<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let url = request_url(req.uri());
        let mut activity = self.log.begin(&url);

        let response = self.dispatch(req, &url);

        activity.outcome(req.method().as_str(), response.status().as_u16());
        activity.flush();
        response
    }

    fn dispatch<B>(&self, req: &Request<B>, url: &str) -> Response<Full<Bytes>> {
        let mut headers = envelope_headers();

        let Some((routes, params)) = self.routes.lookup(req.uri().path()) else {
            return self.fallback(req, headers, url);
        };
        let Some(config) = HttpMethod::from_hyper(req.method()).and_then(|m| route_for(routes, m))
        else {
            return self.fallback(req, headers, url);
        };

        match self.resolve(req, config, &params, &mut headers) {
            Ok((status, body)) => build_response(status, headers, body),
            Err(e) => {
                warn!("{} {} failed: {}", req.method(), url, e);
                error_response(headers, &e.to_string())
            }
        }
    }

    fn resolve<B>(
        &self,
        req: &Request<B>,
        config: &RouteConfig,
        params: &HashMap<String, String>,
        headers: &mut HeaderMap,
    ) -> Result<(hyper::StatusCode, Bytes), MockError> {
        let query = parse_query_string(req.uri().query().unwrap_or(""));
        let request = IncomingRequest {
            method: req.method(),
            uri: req.uri(),
            headers: req.headers(),
            params,
            query: &query,
        };
        let resolved = resolve(&self.context, config, request, headers)?;
        debug!(
            "{} {} resolved to {}",
            config.method, config.path, resolved.status
        );
        Ok((resolved.status, resolved.body))
    }

    /// Catch-all behind the bound routes: preflight for `OPTIONS`, else 500.
    fn fallback<B>(&self, req: &Request<B>, headers: HeaderMap, url: &str) -> Response<Full<Bytes>> {
        if req.method() == Method::OPTIONS {
            return preflight_response(headers, req.headers().get(REQUEST_HEADERS));
        }
        let err = MockError::UnmatchedRoute {
            url: url.to_string(),
        };
        debug!("{}", err);
        error_response(headers, &err.to_string())
    }
}

impl std::fmt::Debug for MockApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockApp")
            .field("routes", &self.routes)
            .field("log", &self.log)
            .finish()
    }
}

/// Handler for `method`; `HEAD` falls back to the `GET` handler.
fn route_for(routes: &MethodRoutes, method: HttpMethod) -> Option<&Arc<RouteConfig>> {
    routes.get(method).or_else(|| match method {
        HttpMethod::Head => routes.get(HttpMethod::Get),
        _ => None,
    })
}
