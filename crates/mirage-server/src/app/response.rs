//! Response envelope: CORS headers, JSON bodies and the error shape.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "*";
pub const ALLOW_HEADERS: &str = "Content-Type, Content-Length";
pub const EXPOSE_HEADERS: &str = "Accept-Ranges, Content-Encoding, Content-Length, Content-Range";

/// Methods advertised when answering a preflight request.
pub const PREFLIGHT_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// Headers present on every mock response, set before resolution.
pub fn envelope_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        "access-control-allow-origin",
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        "access-control-expose-headers",
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
    headers
}

/// Build a response carrying the given header map.
///
/// Falls back to a bare 500 if the builder rejects the parts.
pub fn build_response(
    status: StatusCode,
    headers: HeaderMap,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    if let Some(target) = builder.headers_mut() {
        target.extend(headers);
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        let mut fallback = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// `{"error": message}` with status 500.
pub fn error_response(headers: HeaderMap, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(&ErrorBody { error: message })
        .unwrap_or_else(|_| b"{}".to_vec());
    build_response(StatusCode::INTERNAL_SERVER_ERROR, headers, body)
}

/// Empty 204 for CORS preflight, reflecting any requested headers.
pub fn preflight_response(
    mut headers: HeaderMap,
    requested_headers: Option<&HeaderValue>,
) -> Response<Full<Bytes>> {
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(PREFLIGHT_METHODS),
    );
    if let Some(requested) = requested_headers {
        headers.insert("access-control-allow-headers", requested.clone());
        headers.append(
            HeaderName::from_static("vary"),
            HeaderValue::from_static("Access-Control-Request-Headers"),
        );
    }
    headers.remove(CONTENT_TYPE);
    build_response(StatusCode::NO_CONTENT, headers, Bytes::new())
}
