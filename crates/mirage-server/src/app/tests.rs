//! Tests for request handling through [`MockApp`].
//!
//! Covers the response envelope, route dispatch, the catch-all handler, CORS
//! preflight, hook failures and the per-request activity block.

use super::*;
use crate::activity::capture;
use crate::hooks::{HookError, HookRequest};
use crate::registry::ApiDescription;
use crate::schema::{FakerGenerator, GenerationError, LocalResolver, ReferenceResolver};
use http_body_util::BodyExt;
use hyper::header::CONTENT_TYPE;
use hyper::StatusCode;
use serde_json::{json, Value};
use std::collections::HashSet;

const PETSTORE: &str = r##"{
    "resources": {
        "/pets": {
            "get": {
                "200": {"ref": "PetList", "example": [{"id": 1}]}
            },
            "post": {
                "201": {"example": {"id": 1}},
                "400": {"example": {"error": "bad pet"}}
            }
        },
        "/pets/{id}": {
            "get": {
                "200": {"example": {"id": 1}},
                "404": {"example": {"error": "not found"}}
            }
        },
        "/path": {
            "get": {
                "200": {"ref": "Pet"}
            }
        },
        "/status": {
            "get": {
                "200": {"example": "ok"},
                "404": {"example": "missing"},
                "500": {"example": "broken"}
            }
        },
        "/range": {
            "get": {
                "200": {"ref": "Wide"}
            }
        },
        "/preflight": {
            "options": {
                "200": {"example": {"allowed": true}}
            }
        }
    },
    "definitions": {
        "Pet": {
            "type": "object",
            "required": ["id", "name"],
            "properties": {
                "id": {"type": "integer", "minimum": 1},
                "name": {"type": "string"}
            }
        },
        "Wide": {"type": "number", "minimum": -1.7e308, "maximum": 1.7e308},
        "PetList": "{\"type\": \"array\", \"items\": {\"$ref\": \"#/definitions/Pet\"}, \"minItems\": 1}"
    }
}"##;

fn build_app(options: BindOptions, hooks: HookMap, sink: Option<LogSink>) -> MockApp {
    build_with_generator(Arc::new(FakerGenerator::new()), options, hooks, sink)
}

fn build_with_generator(
    generator: Arc<dyn SchemaValueGenerator>,
    options: BindOptions,
    hooks: HookMap,
    sink: Option<LogSink>,
) -> MockApp {
    let api = ApiDescription::from_json_str(PETSTORE).unwrap();
    let definitions = api.decode_definitions().unwrap();
    let (refs, definitions) = LocalResolver::new().resolve(&definitions).unwrap();
    let registry = Registry::new(api.resources, definitions);
    MockApp::build(
        Arc::new(registry),
        Arc::new(refs),
        generator,
        &options,
        &hooks,
        sink,
    )
    .unwrap()
}

fn app() -> MockApp {
    build_app(BindOptions::default(), HookMap::new(), None)
}

fn request(method: Method, uri: &str) -> Request<()> {
    Request::builder().method(method).uri(uri).body(()).unwrap()
}

async fn send(app: &MockApp, req: Request<()>) -> (StatusCode, HeaderMap, Value) {
    let response = app.handle(&req);
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

async fn get(app: &MockApp, uri: &str) -> (StatusCode, HeaderMap, Value) {
    send(app, request(Method::GET, uri)).await
}

fn assert_envelope(headers: &HeaderMap) {
    assert_eq!(headers[CONTENT_TYPE], "application/json");
    assert_eq!(headers["access-control-allow-origin"], ALLOW_ORIGIN);
    assert_eq!(headers["access-control-allow-headers"], ALLOW_HEADERS);
    assert_eq!(headers["access-control-expose-headers"], EXPOSE_HEADERS);
}

// ============================================================================
// Example scenarios
// ============================================================================

#[tokio::test]
async fn test_default_example() {
    let (status, headers, body) = get(&app(), "/pets/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1}));
    assert_envelope(&headers);
}

#[tokio::test]
async fn test_status_code_query() {
    let (status, headers, body) = get(&app(), "/pets/7?_statusCode=404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "not found"}));
    assert_envelope(&headers);
}

#[tokio::test]
async fn test_schema_only_response_is_generated() {
    let app = app();
    for _ in 0..20 {
        let (status, _, body) = get(&app, "/path").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["id"].as_i64().unwrap() >= 1);
        assert!(body["name"].is_string());
    }
}

#[tokio::test]
async fn test_forced_example_missing() {
    let req = Request::builder()
        .uri("/path")
        .header("x-mock-force-example", "true")
        .body(())
        .unwrap();
    let (status, headers, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "missing example for /path (200)"}));
    assert_envelope(&headers);
}

#[tokio::test]
async fn test_hook_result_is_final_body() {
    let hooks = HookMap::new()
        .with(
            "/pets",
            "get",
            |_: Value, _: &HookRequest, _: &mut HeaderMap| -> Result<Value, HookError> {
                Ok(json!({"id": 1, "hooked": true}))
            },
        )
        .with(
            "/pets/{id}",
            "get",
            |mut sample: Value, req: &HookRequest, _: &mut HeaderMap| -> Result<Value, HookError> {
                sample["hooked"] = json!(true);
                sample["requested"] = json!(req.params["id"]);
                Ok(sample)
            },
        );
    let app = build_app(BindOptions::default(), hooks, None);

    // `/pets` has a schema; `/pets/{id}` only an example.
    let (_, _, body) = get(&app, "/pets").await;
    assert_eq!(body, json!({"id": 1, "hooked": true}));

    let (status, _, body) = get(&app, "/pets/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1, "hooked": true, "requested": "7"}));
}

#[tokio::test]
async fn test_hook_sees_decoded_params() {
    let hooks = HookMap::new().with(
        "/pets/{id}",
        "get",
        |_: Value, req: &HookRequest, _: &mut HeaderMap| -> Result<Value, HookError> {
            Ok(json!({"requested": req.params["id"]}))
        },
    );
    let app = build_app(BindOptions::default(), hooks, None);

    let (status, _, body) = get(&app, "/pets/a%20b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"requested": "a b"}));

    let (status, _, body) = get(&app, "/pets/7/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"requested": "7"}));
}

#[tokio::test]
async fn test_random_status() {
    let app = app();
    let mut seen = HashSet::new();
    for _ in 0..200 {
        let (status, _, _) = get(&app, "/status?_statusCode=random").await;
        assert!([200, 404, 500].contains(&status.as_u16()));
        seen.insert(status);
    }
    assert_eq!(seen.len(), 3);
}

// ============================================================================
// Overrides and errors
// ============================================================================

#[tokio::test]
async fn test_query_overrides_header() {
    let req = Request::builder()
        .uri("/status?_statusCode=404")
        .header("x-mock-status-code", "500")
        .body(())
        .unwrap();
    let (status, _, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!("missing"));

    let req = Request::builder()
        .uri("/status")
        .header("x-mock-status-code", "500")
        .body(())
        .unwrap();
    let (status, _, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!("broken"));
}

#[tokio::test]
async fn test_undeclared_status() {
    let (status, headers, body) = get(&app(), "/pets/7?_statusCode=418").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": "missing response for /pets/7?_statusCode=418 (418)"})
    );
    assert_envelope(&headers);
}

#[tokio::test]
async fn test_force_example_over_schema() {
    let (status, _, body) = get(&app(), "/pets?_forceExample=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": 1}]));

    let (_, _, body) = get(&app(), "/pets").await;
    let pets = body.as_array().unwrap();
    assert!(!pets.is_empty());
    assert!(pets.iter().all(|pet| pet["name"].is_string()));
}

#[tokio::test]
async fn test_process_wide_force_example() {
    let options = BindOptions {
        statuses: None,
        force_example: true,
    };
    let app = build_app(options, HookMap::new(), None);
    let (_, _, body) = get(&app, "/pets").await;
    assert_eq!(body, json!([{"id": 1}]));
}

#[tokio::test]
async fn test_status_allowlist() {
    let options = BindOptions {
        statuses: Some(vec!["404".to_string()]),
        force_example: false,
    };
    let app = build_app(options, HookMap::new(), None);

    let (status, _, body) = get(&app, "/pets/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "not found"}));

    let (status, _, body) = get(&app, "/pets/7?_statusCode=200").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": "missing response for /pets/7?_statusCode=200 (200)"})
    );
}

#[tokio::test]
async fn test_unmatched_route() {
    let (status, headers, body) = get(&app(), "/owners").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Missing resource for /owners"}));
    assert_envelope(&headers);
}

#[tokio::test]
async fn test_unregistered_method() {
    let (status, _, body) = send(&app(), request(Method::DELETE, "/pets/7?x=1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Missing resource for /pets/7?x=1"}));
}

#[tokio::test]
async fn test_head_uses_get_handler() {
    let response = app().handle(&request(Method::HEAD, "/pets/7"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_envelope(response.headers());
}

#[tokio::test]
async fn test_post_route() {
    let (status, _, body) = send(&app(), request(Method::POST, "/pets")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": 1}));
}

// ============================================================================
// Preflight
// ============================================================================

#[tokio::test]
async fn test_options_preflight() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/pets/7")
        .header("access-control-request-headers", "x-mock-status-code")
        .body(())
        .unwrap();
    let (status, headers, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], PREFLIGHT_METHODS);
    assert_eq!(headers["access-control-allow-headers"], "x-mock-status-code");
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_declared_options_route_is_resolved() {
    let (status, headers, body) = send(&app(), request(Method::OPTIONS, "/preflight")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"allowed": true}));
    assert_envelope(&headers);
}

#[tokio::test]
async fn test_wide_number_range_is_generated() {
    let app = app();
    for _ in 0..20 {
        let (status, _, body) = get(&app, "/range").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_f64().unwrap().is_finite());
    }
}

struct PanickingGenerator;

impl SchemaValueGenerator for PanickingGenerator {
    fn generate(&self, _schema: &Value, _refs: &RefTable) -> Result<Value, GenerationError> {
        panic!("range overflow")
    }
}

#[tokio::test]
async fn test_generator_panic_becomes_error_envelope() {
    let (sink, blocks) = capture();
    let app = build_with_generator(
        Arc::new(PanickingGenerator),
        BindOptions::default(),
        HookMap::new(),
        Some(sink),
    );

    let (status, headers, body) = get(&app, "/range").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": "schema generation panicked: range overflow"})
    );
    assert_envelope(&headers);
    assert!(blocks.lock()[1].ends_with("-> 500"));

    let (status, _, _) = get(&app, "/pets/7").await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Hooks
// ============================================================================

#[tokio::test]
async fn test_hook_failure_becomes_error_envelope() {
    let hooks = HookMap::new()
        .with(
            "/pets/{id}",
            "get",
            |_: Value, _: &HookRequest, _: &mut HeaderMap| -> Result<Value, HookError> {
                Err(HookError::new("pet store closed"))
            },
        )
        .with(
            "/status",
            "get",
            |_: Value, _: &HookRequest, _: &mut HeaderMap| -> Result<Value, HookError> {
                panic!("hook exploded")
            },
        );
    let app = build_app(BindOptions::default(), hooks, None);

    let (status, headers, body) = get(&app, "/pets/7").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "pet store closed"}));
    assert_envelope(&headers);

    let (status, _, body) = get(&app, "/status").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "hook exploded"}));

    // The app keeps serving after a hook panic.
    let (status, _, _) = get(&app, "/pets").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_hook_can_set_response_headers() {
    let hooks = HookMap::new().with(
        "/pets/{id}",
        "GET",
        |sample: Value, _: &HookRequest, res: &mut HeaderMap| -> Result<Value, HookError> {
            res.insert("x-request-id", "abc".parse().unwrap());
            Ok(sample)
        },
    );
    let app = build_app(BindOptions::default(), hooks, None);
    let (_, headers, _) = get(&app, "/pets/7").await;
    assert_eq!(headers["x-request-id"], "abc");
    assert_envelope(&headers);
}

// ============================================================================
// Activity log
// ============================================================================

#[tokio::test]
async fn test_activity_blocks() {
    let (sink, blocks) = capture();
    let app = build_app(BindOptions::default(), HookMap::new(), Some(sink));

    {
        let blocks = blocks.lock();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with("Resources:"));
        assert!(blocks[0].contains("/pets/:id"));
    }

    get(&app, "/pets/7?_statusCode=404").await;
    get(&app, "/owners").await;

    let blocks = blocks.lock();
    assert_eq!(blocks.len(), 3);
    assert!(blocks[1].contains("/pets/7?_statusCode=404"));
    assert!(blocks[1].ends_with("-> 404"));
    assert!(blocks[2].contains("/owners"));
    assert!(blocks[2].ends_with("-> 500"));
}

#[tokio::test]
async fn test_silent_app() {
    let app = app();
    assert!(app.logger().is_silent());
    assert_eq!(app.routes().len(), 7);
}
