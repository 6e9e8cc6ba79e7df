//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use cyberrag_common::VERSION;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub index: CheckResult,
    pub embedding_model: String,
    /// `None` when no LLM is configured
    pub llm_model: Option<String>,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

/// Readiness probe - checks the vector index
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let index_check = match state.index().count().await {
        Ok(records) => CheckResult {
            status: "up".to_string(),
            records: Some(records),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            records: None,
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    let all_healthy = index_check.status == "up";

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks {
            index: index_check,
            embedding_model: state.embeddings.model_name().to_string(),
            llm_model: state.llm.as_ref().map(|llm| llm.model_name().to_string()),
        },
    })
}
