use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::util::ServiceExt;

pub async fn request(app: &Router, method: Method, path: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(path);

    let req = if let Some(payload) = body {
        builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("empty body")
    };

    app.clone().oneshot(req).await.expect("oneshot response")
}

pub async fn request_raw(app: &Router, method: Method, path: &str, body: &str) -> Response {
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request body");
    app.clone().oneshot(req).await.expect("oneshot response")
}

pub async fn response_json(resp: Response) -> (StatusCode, HeaderMap, Value) {
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body bytes");

    let json = if bytes.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_slice::<Value>(&bytes).expect("parse json body")
    };

    (status, headers, json)
}

pub async fn get_json(app: &Router, path: &str) -> (StatusCode, Value) {
    let (status, _, body) = response_json(request(app, Method::GET, path, None).await).await;
    (status, body)
}

pub async fn post_json(app: &Router, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, body) = response_json(request(app, Method::POST, path, body).await).await;
    (status, body)
}

pub fn assert_json_error(body: &Value, code: &str) {
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], code);
    assert!(body.get("message").is_some());
    assert!(body["traceId"].is_string());
}

pub fn assert_success(status: StatusCode, body: &Value) {
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
}

/// 轮询 /api/metrics，直到谓词成立或超时
pub async fn wait_for_metrics<F>(app: &Router, timeout: Duration, pred: F) -> Value
where
    F: Fn(&Value) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let (_, metrics) = get_json(app, "/api/metrics").await;
        if pred(&metrics) {
            return metrics;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("metrics did not reach expected state: {metrics}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
