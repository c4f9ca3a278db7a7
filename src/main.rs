use iris_pipeline::{
    api::{build_router, AppState},
    config::Config,
    metrics::{init_metrics, MODEL_LOADED},
    ml::{provider_from_config, InferenceService, ModelStore},
    telemetry::init_tracing,
};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let (config, config_error) = match Config::load_validated() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_tracing(&config.observability);
    if let Some(e) = config_error {
        tracing::warn!("Failed to load configuration: {}", e);
        tracing::warn!("Using default configuration");
    }

    tracing::info!("Starting iris inference service v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.metrics_enabled {
        if let Err(e) = init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Load the model once; the state never changes afterwards
    let store = ModelStore::new(&config.paths.model);
    let provider = provider_from_config(&config.artifact, &config.paths.model);
    let service = InferenceService::initialize(&store, provider.as_ref()).await;
    MODEL_LOADED.set(if service.is_loaded() { 1.0 } else { 0.0 });
    tracing::info!(state = %service.state(), "Inference service ready");

    let mut app = build_router(AppState::new(service));
    if config.server.cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("HTTP server listening on http://{}", addr);
    tracing::info!("   Predict: POST http://{}/predict", addr);
    tracing::info!("   Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
