//! CyberRAG API Gateway
//!
//! HTTP surface over the pipeline:
//! - Ingestion of posted or fetched reports
//! - Query routing, retrieval and answers
//! - Rate limiting and request metrics

pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::AppState;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Maximum concurrent requests (backpressure control)
const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Pipeline endpoints, rate limited
    let mut pipeline_routes = Router::new()
        .route("/ingest", post(handlers::ingest::ingest))
        .route("/route", post(handlers::query::route))
        .route("/retrieve", post(handlers::query::retrieve))
        .route("/query", post(handlers::query::query));

    let rate_limit = &state.config.rate_limit;
    if rate_limit.enabled {
        let limiter =
            middleware::create_rate_limiter(rate_limit.requests_per_second, rate_limit.burst);
        pipeline_routes = pipeline_routes.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    let api_routes = Router::new()
        // Health endpoints (never rate limited)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .merge(pipeline_routes);

    let request_timeout = state.config.request_timeout();

    Router::new()
        .nest("/v1", api_routes)
        .layer(from_fn(middleware::track_metrics))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .with_state(state)
}
