//! Per-request response resolution.
//!
//! Given a bound [`RouteConfig`] and the incoming request, pick a status code and
//! then a body from the literal example, a freshly generated value, or the hook.
//!
//! Status precedence: `_statusCode` query, `x-mock-status-code` header, then the
//! route default. `random` draws from the route's status keys. Whatever is chosen
//! must be one of those keys.
//!
//! Body precedence (not forced): generated value when a schema resolves, else the
//! literal example. Forced: the literal example only. A hook, when present, gets
//! the sample and its return value is the final body.

mod overrides;


pub use overrides::{
    parse_query_string, RequestOverrides, FORCE_EXAMPLE_HEADER, FORCE_EXAMPLE_PARAM,
    RANDOM_STATUS, STATUS_HEADER, STATUS_PARAM,
};

use crate::binder::RouteConfig;
use crate::error::MockError;
use crate::hooks::{self, HookRequest};
use crate::registry::Registry;
use crate::schema::{generate_value, RefTable, SchemaValueGenerator};
use bytes::Bytes;
use hyper::{HeaderMap, Method, StatusCode, Uri};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, immutable inputs to resolution.
#[derive(Clone)]
pub struct ResolveContext {
    pub registry: Arc<Registry>,
    pub refs: Arc<RefTable>,
    pub generator: Arc<dyn SchemaValueGenerator>,
}

impl ResolveContext {
    pub fn new(
        registry: Arc<Registry>,
        refs: Arc<RefTable>,
        generator: Arc<dyn SchemaValueGenerator>,
    ) -> Self {
        Self {
            registry,
            refs,
            generator,
        }
    }
}

/// Path plus query, as echoed in error messages and the activity log.
pub fn request_url(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// Borrowed view of the request being answered.
#[derive(Debug, Clone, Copy)]
pub struct IncomingRequest<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub params: &'a HashMap<String, String>,
    pub query: &'a HashMap<String, String>,
}

impl IncomingRequest<'_> {
    pub fn url(&self) -> String {
        request_url(self.uri)
    }

    fn to_hook_request(self) -> HookRequest {
        HookRequest {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            params: self.params.clone(),
            query: self.query.clone(),
        }
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Choose the status for a request.
pub fn select_status<R: Rng + ?Sized>(
    config: &RouteConfig,
    requested: Option<&str>,
    url: &str,
    rng: &mut R,
) -> Result<String, MockError> {
    let no_statuses = || MockError::NoStatuses {
        url: url.to_string(),
    };

    let status = match requested {
        Some(RANDOM_STATUS) => config
            .status_keys
            .choose(rng)
            .cloned()
            .ok_or_else(no_statuses)?,
        Some(explicit) => explicit.to_string(),
        None => config.default_status.clone().ok_or_else(no_statuses)?,
    };

    if !config.status_keys.contains(&status) {
        return Err(MockError::UnresolvedStatus {
            url: url.to_string(),
            status,
        });
    }
    Ok(status)
}

/// Choose the sample body for a validated status.
///
/// Without a hook the literal example is borrowed from the route config; with a
/// hook it is cloned so the hook owns what it mutates.
pub fn select_body<'a>(
    ctx: &'a ResolveContext,
    config: &'a RouteConfig,
    status: &str,
    force_example: bool,
    url: &str,
) -> Result<Cow<'a, Value>, MockError> {
    let missing = || MockError::MissingExample {
        url: url.to_string(),
        status: status.to_string(),
    };

    let spec = config.responses.get(status);
    let example = spec.and_then(|spec| spec.literal_example());
    let schema = spec.and_then(|spec| ctx.registry.schema_for(spec));

    if example.is_none() && schema.is_none() {
        return Err(missing());
    }

    if force_example {
        return example.map(Cow::Borrowed).ok_or_else(missing);
    }

    match (schema, example) {
        (Some(schema), _) => {
            let value = generate_value(ctx.generator.as_ref(), schema, &ctx.refs)?;
            Ok(Cow::Owned(value))
        }
        (None, Some(example)) if config.hook.is_some() => Ok(Cow::Owned(example.clone())),
        (None, Some(example)) => Ok(Cow::Borrowed(example)),
        (None, None) => Err(missing()),
    }
}

/// Resolve the full response. `response_headers` is handed to the hook, which
/// may edit it.
pub fn resolve(
    ctx: &ResolveContext,
    config: &RouteConfig,
    request: IncomingRequest<'_>,
    response_headers: &mut HeaderMap,
) -> Result<Resolved, MockError> {
    let url = request.url();
    let overrides = RequestOverrides::from_request(request.query, request.headers);

    let status = {
        let mut rng = rand::thread_rng();
        select_status(config, overrides.status.as_deref(), &url, &mut rng)?
    };
    let code = status
        .trim()
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| MockError::InvalidStatus {
            url: url.clone(),
            status: status.clone(),
        })?;

    let force_example = overrides.forces_example() || config.force_example;
    let sample = select_body(ctx, config, &status, force_example, &url)?;

    let body = match config.hook {
        Some(ref hook) => {
            let hooked = hooks::invoke(
                hook.as_ref(),
                sample.into_owned(),
                &request.to_hook_request(),
                response_headers,
            )
            .map_err(|e| MockError::Hook(e.message))?;
            Cow::Owned(hooked)
        }
        None => sample,
    };

    let body = serde_json::to_vec(body.as_ref()).unwrap_or_else(|_| b"null".to_vec());
    Ok(Resolved {
        status: code,
        body: Bytes::from(body),
    })
}
