//! CyberRAG API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Report ingestion
//! - Query routing, retrieval and answer generation
//! - Rate limiting
//! - Observability (logging, metrics)

use cyberrag_common::{
    config::AppConfig,
    metrics::{self, LATENCY_BUCKETS, MODEL_BUCKETS},
    telemetry, VERSION,
};
use cyberrag_gateway::{create_router, AppState};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    telemetry::init_tracing(&config.observability);
    config.validate()?;

    info!("Starting CyberRAG API Gateway v{}", VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(
                Matcher::Suffix("request_duration_seconds".to_string()),
                LATENCY_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Suffix("retrieval_duration_seconds".to_string()),
                LATENCY_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Suffix("embedding_duration_seconds".to_string()),
                MODEL_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Suffix("llm_duration_seconds".to_string()),
                MODEL_BUCKETS,
            )?
            .install()?;
        info!(addr = %metrics_addr, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create app state
    let state = AppState::from_config(config).map_err(|e| {
        error!(error = %e, "Failed to initialize pipeline");
        e
    })?;

    info!(
        index = state.index().name(),
        embedding_model = state.embeddings.model_name(),
        llm = state.llm.as_ref().map(|llm| llm.model_name()).unwrap_or("disabled"),
        "Pipeline ready"
    );

    // Build the router
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
