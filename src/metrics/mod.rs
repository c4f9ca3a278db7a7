//! Prometheus metrics for the inference service.
//!
//! - HTTP request counts and latency (recorded by [`middleware::track_metrics`])
//! - Predicted rows and rejected prediction requests
//! - Whether a model was loaded at startup
//!
//! # Example
//! ```no_run
//! use iris_pipeline::metrics::{init_metrics, PREDICTIONS_TOTAL};
//!
//! init_metrics().unwrap();
//! PREDICTIONS_TOTAL.inc_by(3.0);
//! ```

pub mod middleware;

pub use middleware::track_metrics;

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use prometheus::{Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "iris_pipeline";

lazy_static! {
    /// Registry backing `GET /metrics`
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Total number of HTTP requests
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Total number of rows given a prediction
    pub static ref PREDICTIONS_TOTAL: Counter = Counter::with_opts(
        Opts::new("predictions_total", "Total number of rows predicted")
            .namespace(NAMESPACE)
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Prediction requests that did not produce labels
    ///
    /// Labels: kind (error code)
    pub static ref PREDICTION_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("prediction_errors_total", "Total number of failed prediction requests")
            .namespace(NAMESPACE),
        &["kind"]
    ).expect("Failed to create PREDICTION_ERRORS_TOTAL metric");

    /// 1 when the service started with a model, 0 when degraded
    pub static ref MODEL_LOADED: Gauge = Gauge::with_opts(
        Opts::new("model_loaded", "Whether a model is loaded")
            .namespace(NAMESPACE)
    ).expect("Failed to create MODEL_LOADED metric");
}

static INIT: OnceCell<()> = OnceCell::new();

/// Register all metrics with [`PROMETHEUS_REGISTRY`].
///
/// Safe to call more than once; registration happens on the first call.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    INIT.get_or_try_init(|| {
        PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
        PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;
        PROMETHEUS_REGISTRY.register(Box::new(PREDICTIONS_TOTAL.clone()))?;
        PROMETHEUS_REGISTRY.register(Box::new(PREDICTION_ERRORS_TOTAL.clone()))?;
        PROMETHEUS_REGISTRY.register(Box::new(MODEL_LOADED.clone()))?;

        tracing::info!("Prometheus metrics initialized");
        Ok(())
    })
    .map(|_| ())
}

/// Prometheus text exposition of every registered metric
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_gather_includes_prediction_metrics() {
        init_metrics().unwrap();
        PREDICTIONS_TOTAL.inc();
        PREDICTION_ERRORS_TOTAL
            .with_label_values(&["VALIDATION_ERROR"])
            .inc();

        let output = gather_metrics();
        assert!(output.contains("iris_pipeline_predictions_total"));
        assert!(output.contains("iris_pipeline_prediction_errors_total"));
        assert!(output.contains("iris_pipeline_model_loaded"));
    }
}
