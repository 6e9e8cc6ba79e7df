//! Routing, retrieval and answer handlers

use super::validate;
use crate::AppState;
use axum::{extract::State, Json};
use cyberrag_common::errors::{AppError, Result};
use cyberrag_search::pipeline::QueryOutcome;
use cyberrag_search::router::matched_keyword;
use cyberrag_search::{RetrievalStrategy, RetrievedChunk, RouteDecision};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RouteRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub query: String,
    pub route: RouteDecision,
    /// Security keyword that forced the knowledge base, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<&'static str>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RetrieveRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,

    #[serde(default)]
    pub strategy: RetrievalStrategy,

    /// Results to return (default `retrieval.default_k`)
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub query: String,
    pub strategy: RetrievalStrategy,
    pub total_results: usize,
    pub results: Vec<RetrievedChunk>,
    pub processing_time_ms: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,

    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub outcome: QueryOutcome,
    pub processing_time_ms: u64,
}

/// Resolve `k` against the configured default and ceiling
fn resolve_k(state: &AppState, k: Option<usize>) -> Result<usize> {
    let retrieval = &state.config.retrieval;
    match k {
        None => Ok(retrieval.default_k),
        Some(k) if (1..=retrieval.max_k).contains(&k) => Ok(k),
        Some(k) => Err(AppError::Validation {
            message: format!("k must be between 1 and {}, got {}", retrieval.max_k, k),
            field: Some("k".to_string()),
        }),
    }
}

/// Decide where a query should be answered from
pub async fn route(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<RouteResponse>> {
    validate(&request)?;

    let route = state.pipeline.router().route(&request.query).await;

    Ok(Json(RouteResponse {
        matched_keyword: matched_keyword(&request.query),
        query: request.query,
        route,
    }))
}

/// Retrieve chunks with an explicit strategy
pub async fn retrieve(
    State(state): State<AppState>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>> {
    let start = Instant::now();
    validate(&request)?;
    let k = resolve_k(&state, request.k)?;

    let results = state
        .pipeline
        .retriever()
        .retrieve(&request.query, request.strategy, k)
        .await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        strategy = %request.strategy,
        k,
        results = results.len(),
        latency_ms = processing_time_ms,
        "Retrieval completed"
    );

    Ok(Json(RetrieveResponse {
        query: request.query,
        strategy: request.strategy,
        total_results: results.len(),
        results,
        processing_time_ms,
    }))
}

/// Route, retrieve and answer
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    validate(&request)?;
    let k = resolve_k(&state, request.k)?;

    let outcome = state.pipeline.run_with_k(&request.query, k).await?;

    Ok(Json(QueryResponse {
        outcome,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
