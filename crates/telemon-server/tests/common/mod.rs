#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use telemon_payload::RsaProcessor;
use telemon_server::app;
use telemon_server::state::AppState;
use telemon_storage::memory::MemoryStore;
use tower::util::ServiceExt;

pub struct TestContext {
    pub state: AppState,
    pub app: Router,
}

pub fn build_test_context(
    hash_key: Option<&str>,
    crypto: Option<Arc<RsaProcessor>>,
) -> TestContext {
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        hash_key.map(str::to_owned),
        crypto,
    );
    let app = app::build_http_app(state.clone());
    TestContext { state, app }
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    (status, headers, bytes.to_vec())
}

pub async fn get_text(app: &Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let (status, _, body) = send(app, req).await;
    (status, String::from_utf8_lossy(&body).to_string())
}

pub async fn post_empty(app: &Router, uri: &str) -> StatusCode {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, req).await.0
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build");
    let (status, _, bytes) = send(app, req).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, json)
}
