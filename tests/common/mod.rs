//! Shared fixtures for the integration tests
//!
//! A model is trained once per test binary and shared through
//! [`loaded_service`]; file-based tests get their own [`TempDir`].

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use iris_pipeline::{
    api::{build_router, AppState},
    dataset::FeatureDataset,
    ml::{InferenceService, ModelTrainer, TrainingConfig},
};
use once_cell::sync::Lazy;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Fewer trees than the default keeps the suite fast
pub fn test_training_config() -> TrainingConfig {
    TrainingConfig {
        n_trees: 20,
        ..Default::default()
    }
}

static SERVICE: Lazy<InferenceService> = Lazy::new(|| {
    let model = ModelTrainer::new(test_training_config())
        .fit(&FeatureDataset::builtin())
        .unwrap();
    InferenceService::loaded(model)
});

pub fn loaded_service() -> InferenceService {
    SERVICE.clone()
}

pub fn loaded_app() -> Router {
    build_router(AppState::new(loaded_service()))
}

pub fn degraded_app() -> Router {
    build_router(AppState::new(InferenceService::degraded()))
}

/// Fresh directory with `data/iris.csv` written by the preparer
pub fn prepared_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    iris_pipeline::dataset::DataPreparer::new(dir.path().join("data").join("iris.csv"))
        .prepare()
        .unwrap();
    dir
}

/// Response status and raw body
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

pub async fn get(app: Router, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a raw body as `application/json`
pub async fn post_json(app: Router, uri: &str, body: &str) -> TestResponse {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();

    TestResponse {
        status,
        content_type,
        body,
    }
}

/// Value of the first sample line for `metric_name` whose labels contain
/// every `key="value"` pair in `labels`
pub fn metric_value(output: &str, metric_name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    output
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            line.split(|c| c == '{' || c == ' ')
                .next()
                .map_or(false, |name| name == metric_name)
        })
        .find(|line| {
            labels
                .iter()
                .all(|(k, v)| line.contains(&format!("{}=\"{}\"", k, v)))
        })
        .and_then(|line| line.split_whitespace().last()?.parse().ok())
}
