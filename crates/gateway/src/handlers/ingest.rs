//! Ingestion handler

use super::validate;
use crate::AppState;
use axum::{extract::State, Json};
use cyberrag_common::{errors::Result, models::Report};
use cyberrag_ingestion::ChunkingStrategy;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

/// Ingest request; without `reports` the configured source is fetched
#[derive(Debug, Default, Deserialize, Validate)]
pub struct IngestRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 500))]
    pub reports: Option<Vec<Report>>,

    /// Reports to fetch from the source (default `source.fetch_limit`)
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,

    /// Chunking strategy override
    #[serde(default)]
    pub strategy: Option<ChunkingStrategy>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// `request` for posted reports, otherwise the source name
    pub source: String,
    pub strategy: ChunkingStrategy,
    pub reports_processed: usize,
    pub chunks_indexed: usize,
    pub processing_time_ms: u64,
}

pub async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();
    validate(&request)?;

    let strategy = request
        .strategy
        .unwrap_or_else(|| state.coordinator.strategy());

    let (source, reports) = match request.reports {
        Some(reports) => ("request".to_string(), reports),
        None => {
            let limit = request.limit.unwrap_or(state.config.source.fetch_limit);
            let reports = state.source.fetch(limit).await;
            (state.source.name().to_string(), reports)
        }
    };

    let summary = state
        .coordinator
        .ingest_with_strategy(&reports, strategy)
        .await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        source = %source,
        strategy = %strategy,
        reports = summary.reports_processed,
        chunks = summary.chunks_indexed,
        latency_ms = processing_time_ms,
        "Ingestion request completed"
    );

    Ok(Json(IngestResponse {
        source,
        strategy,
        reports_processed: summary.reports_processed,
        chunks_indexed: summary.chunks_indexed,
        processing_time_ms,
    }))
}
