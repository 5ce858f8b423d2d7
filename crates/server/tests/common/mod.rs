//! Common test utilities for API testing over the mock engine.
//!
//! The fixture builds the real router around a [`BatchController`] whose
//! engine is a [`MockEngine`], so every endpoint can be exercised in-process
//! without an ffmpeg binary.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use wavesmith_core::{
    testing::{fixtures, MockEngine},
    BatchConfig, BatchController, Config,
};
use wavesmith_server::{api::create_router, state::AppState};

const BOUNDARY: &str = "wavesmith-test-boundary";

/// Test fixture with an in-process router and a controllable engine.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new();
///     let response = fixture.upload(&[("song.mp3", b"data")], Some("wav")).await;
///     assert_eq!(response.status, StatusCode::ACCEPTED);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub engine: MockEngine,
    pub controller: BatchController,
}

/// Response from a JSON test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response kept as raw bytes (downloads)
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_batch_config(BatchConfig::default())
    }

    pub fn with_batch_config(batch: BatchConfig) -> Self {
        let engine = MockEngine::new();
        let controller = fixtures::controller_with_config(&engine, batch.clone());
        let config = Config {
            batch,
            ..Config::default()
        };
        let state = Arc::new(AppState::new(config, controller.clone()));
        let router = create_router(state);

        Self {
            router,
            engine,
            controller,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Upload files as multipart `file` fields, with an optional `format` field.
    pub async fn upload(&self, files: &[(&str, &[u8])], format: Option<&str>) -> TestResponse {
        self.post_multipart(multipart_body(files, format)).await
    }

    /// POST a prebuilt multipart body to `/api/v1/jobs`.
    pub async fn post_multipart(&self, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/jobs")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        json_response(self.send(request).await)
    }

    /// GET a path and keep the body as bytes.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        json_response(self.send(request).await)
    }

    async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawResponse {
            status,
            headers,
            bytes,
        }
    }
}

fn json_response(raw: RawResponse) -> TestResponse {
    let body = if raw.bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&raw.bytes).unwrap_or(Value::Null)
    };
    TestResponse {
        status: raw.status,
        body,
    }
}

/// Build a multipart/form-data body using the fixture's boundary.
pub fn multipart_body(files: &[(&str, &[u8])], format: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(format) = format {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"format\"\r\n\r\n{}\r\n",
                BOUNDARY, format
            )
            .as_bytes(),
        );
    }
    for (name, data) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Poll `GET /api/v1/jobs/{id}` until the job is completed or failed.
pub async fn wait_for_terminal(fixture: &TestFixture, id: &str) -> Value {
    let path = format!("/api/v1/jobs/{}", urlencode(id));
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let response = fixture.get(&path).await;
        let status = response.body["status"].as_str().unwrap_or_default().to_string();
        if status == "completed" || status == "failed" {
            return response.body;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("Job {} did not settle, last status {:?}", id, status);
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

/// Percent-encode a job id for use in a path.
pub fn urlencode(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
