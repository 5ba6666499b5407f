use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::util::ServiceExt;

/// Buffered response: status, headers and the parsed JSON body (`{}` when
/// the body is empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send_with_headers(
    app: &Router,
    method: Method,
    path: &str,
    json: Option<Value>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(path);
    for &(name, value) in headers {
        builder = builder.header(name, value);
    }
    let body = match json {
        Some(payload) => {
            builder = builder.header("content-type", "application/json");
            Body::from(payload.to_string())
        }
        None => Body::empty(),
    };

    let resp = app
        .clone()
        .oneshot(builder.body(body).expect("build request"))
        .await
        .expect("router is infallible");

    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("read body");
    let body = if bytes.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };

    TestResponse { status, headers, body }
}

pub async fn call(app: &Router, method: Method, path: &str, json: Option<Value>) -> (StatusCode, Value) {
    let resp = send_with_headers(app, method, path, json, &[]).await;
    (resp.status, resp.body)
}

pub fn assert_json_error(body: &Value, code: &str) {
    assert_eq!(body["success"], false, "expected error envelope: {body}");
    assert_eq!(body["code"], code, "unexpected error code: {body}");
    assert!(body["message"].is_string());
}

pub fn assert_status_ok_json(status: StatusCode, body: &Value) {
    assert!(status.is_success(), "status {status}: {body}");
    assert_eq!(body["success"], true);
    assert!(!body["data"].is_null());
}
