#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tally_server::app::build_http_app;
use tally_server::state::AppState;
use tally_storage::{FileStore, FileStoreConfig, MemoryStore, Storage};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub storage: Arc<dyn Storage>,
    pub app: axum::Router,
}

/// Router over a write-through file store in a temp directory.
pub async fn build_test_context() -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let store = FileStore::open(
        Arc::new(MemoryStore::new()),
        FileStoreConfig {
            file_path: Some(temp_dir.path().join("metrics.json")),
            store_interval: Duration::ZERO,
            restore: false,
        },
    )
    .await?;
    let storage: Arc<dyn Storage> = Arc::new(store);
    let app = build_http_app(AppState::new(storage.clone()));
    Ok(TestContext {
        temp_dir,
        storage,
        app,
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
    pub trace_id: Option<String>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> Result<TestResponse> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let trace_id = response
        .headers()
        .get("X-Trace-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(TestResponse {
        status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
        trace_id,
    })
}

pub async fn request_no_body(app: &axum::Router, method: &str, uri: &str) -> Result<TestResponse> {
    let request = Request::builder().method(method).uri(uri).body(Body::empty())?;
    send(app, request).await
}

pub async fn post_json(app: &axum::Router, uri: &str, body: serde_json::Value) -> Result<TestResponse> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body)?))?;
    send(app, request).await
}

pub async fn post_gzip_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> Result<TestResponse> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&serde_json::to_vec(&body)?)?;
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_ENCODING, "gzip")
        .body(Body::from(encoder.finish()?))?;
    send(app, request).await
}
