#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use breeze_kernel::config::KernelConfig;
use breeze_kernel::http::build_router;
use http_body_util::BodyExt;
use std::path::Path;
use tower::ServiceExt;

/// Builds the full router over a data directory owned by the test.
pub fn build_test_app(data_dir: &Path) -> Router {
    let config = KernelConfig {
        data_dir: data_dir.to_path_buf(),
        ..KernelConfig::default()
    };
    build_router(breeze_kernel::build_state(config))
}

pub fn reading_bytes(temperature: f32, humidity: f32, fan_rpm: f32) -> Vec<u8> {
    [temperature, humidity, fan_rpm]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_bytes(app: &Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/octet-stream")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub fn actuation(bytes: &[u8]) -> f32 {
    f32::from_le_bytes(bytes.try_into().expect("4-byte actuation"))
}
