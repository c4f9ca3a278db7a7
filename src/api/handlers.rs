use crate::api::AppState;
use crate::dataset::Label;
use crate::error::{AppError, Result};
use crate::metrics::{gather_metrics, PREDICTIONS_TOTAL, PREDICTION_ERRORS_TOTAL};
use crate::ml::Classifier;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Liveness text
pub const HOME_MESSAGE: &str = "ML Model Inference Service is running!";

/// Liveness endpoint
pub async fn home() -> &'static str {
    HOME_MESSAGE
}

/// Health check endpoint
///
/// Always 200; a service without a model reports `degraded`.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.service.model().map(|model| {
        let metadata = model.metadata();
        ModelSummary {
            id: metadata.id,
            algorithm: metadata.algorithm.clone(),
            trained_at: metadata.trained_at,
            n_features: metadata.n_features,
            feature_names: metadata.feature_names.clone(),
            classes: metadata.classes.clone(),
        }
    });

    Json(HealthResponse {
        status: if model.is_some() { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        model_loaded: model.is_some(),
        model,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSummary>,
}

#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub id: Uuid,
    pub algorithm: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub n_features: usize,
    pub feature_names: Vec<String>,
    pub classes: Vec<Label>,
}

/// Predict a label for every row in the body
///
/// A missing model is reported before the body is looked at.
pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let result = predict_rows(&state, payload);

    match &result {
        Ok(response) => PREDICTIONS_TOTAL.inc_by(response.prediction.len() as f64),
        Err(e) => PREDICTION_ERRORS_TOTAL
            .with_label_values(&[e.error_code()])
            .inc(),
    }

    result.map(Json)
}

fn predict_rows(
    state: &AppState,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<PredictionResponse> {
    if !state.service.is_loaded() {
        return Err(AppError::ModelNotLoaded);
    }

    let Json(body) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let prediction = state.service.predict(&body)?;

    Ok(PredictionResponse { prediction })
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: Vec<Label>,
}

/// Prometheus scrape endpoint
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
