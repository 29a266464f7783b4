#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use setup_admin::app::{router, AppState};
use setup_admin::config::{AppConfig, SetupToken};
use setup_admin::directory::{Directory, MemoryDirectory};

pub const TOKEN: &str = "test-setup-token";
pub const ENDPOINT: &str = "/setup-admin";

pub struct TestApp {
    pub router: Router,
    pub directory: Arc<MemoryDirectory>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

/// App with the test token configured and the given users in the directory.
pub fn spawn_app(users: &[(&str, &str)]) -> TestApp {
    spawn_app_with_token(users, Some(TOKEN))
}

pub fn spawn_app_with_token(users: &[(&str, &str)], token: Option<&str>) -> TestApp {
    let directory = Arc::new(MemoryDirectory::with_users(users.iter().copied()));
    TestApp {
        router: build_router(directory.clone(), token),
        directory,
    }
}

/// Router over any directory implementation, with the test token configured.
pub fn router_with_directory(directory: Arc<dyn Directory>) -> Router {
    build_router(directory, Some(TOKEN))
}

fn build_router(directory: Arc<dyn Directory>, token: Option<&str>) -> Router {
    let mut config = AppConfig::default();
    config.bootstrap.setup_token = token.and_then(SetupToken::new);
    router(AppState::new(config, directory))
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body")
        .to_vec();

    TestResponse { status, headers, body }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send(&self.router, request).await
    }

    /// POST a raw body with the test token and a matching Content-Length.
    pub async fn post_raw(&self, body: &str) -> TestResponse {
        self.send(post_request(body, Some(TOKEN))).await
    }

    pub async fn bootstrap(&self, email: &str) -> TestResponse {
        let body = serde_json::json!({ "email": email }).to_string();
        self.post_raw(&body).await
    }
}

pub fn post_request(body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(ENDPOINT)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len());
    if let Some(token) = token {
        builder = builder.header("x-setup-token", token);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}
