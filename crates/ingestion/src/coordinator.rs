//! Ingestion coordinator
//!
//! Report → chunks → embeddings → vector index, in one batch. Record ids are
//! derived from report id and chunk ordinal, so running the same reports
//! through again overwrites the records it wrote before.

use crate::chunker::{ChunkingEngine, ChunkingStrategy};
use crate::errors::IngestionError;
use cyberrag_common::embeddings::EmbeddingProvider;
use cyberrag_common::index::{dedupe_records, VectorIndex};
use cyberrag_common::metrics;
use cyberrag_common::models::{Report, VectorRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Outcome of one ingestion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub chunks_indexed: usize,
    pub reports_processed: usize,
}

pub struct IngestionCoordinator {
    chunker: ChunkingEngine,
    embeddings: EmbeddingProvider,
    index: Arc<dyn VectorIndex>,
    strategy: ChunkingStrategy,
}

impl IngestionCoordinator {
    /// Fails when the embedding model and the index disagree on dimension
    pub fn new(
        chunker: ChunkingEngine,
        embeddings: EmbeddingProvider,
        index: Arc<dyn VectorIndex>,
        strategy: ChunkingStrategy,
    ) -> Result<Self, IngestionError> {
        if embeddings.dimension() != index.dimension() {
            return Err(IngestionError::Configuration(format!(
                "Embedding model produces {}-dimensional vectors but the index expects {}",
                embeddings.dimension(),
                index.dimension()
            )));
        }

        Ok(Self {
            chunker,
            embeddings,
            index,
            strategy,
        })
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Ingest with the configured chunking strategy
    pub async fn ingest(&self, reports: &[Report]) -> Result<IngestionSummary, IngestionError> {
        self.ingest_with_strategy(reports, self.strategy).await
    }

    /// Chunk every report, embed all chunks in one call, upsert all records in one call.
    ///
    /// An embedding failure aborts before anything is written.
    #[instrument(skip(self, reports), fields(reports = reports.len(), strategy = %strategy))]
    pub async fn ingest_with_strategy(
        &self,
        reports: &[Report],
        strategy: ChunkingStrategy,
    ) -> Result<IngestionSummary, IngestionError> {
        if reports.is_empty() {
            return Ok(IngestionSummary::default());
        }

        let start = Instant::now();

        let mut chunks = Vec::new();
        for report in reports {
            let report_chunks = self
                .chunker
                .chunk(&report.body_text, &report.metadata(), strategy)
                .await;
            debug!(report_id = %report.id, chunks = report_chunks.len(), "Report chunked");
            chunks.extend(report_chunks);
        }

        if chunks.is_empty() {
            info!("Reports produced no chunks");
            return Ok(IngestionSummary {
                chunks_indexed: 0,
                reports_processed: reports.len(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        // A report repeated in one call maps to the same record ids
        let records = dedupe_records(
            chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| VectorRecord::from_chunk(chunk, vector))
                .collect(),
        );

        let written = self.index.upsert(records).await?;

        let summary = IngestionSummary {
            chunks_indexed: written,
            reports_processed: reports.len(),
        };

        metrics::record_ingestion(start.elapsed().as_secs_f64(), summary.reports_processed, written);
        info!(
            chunks_indexed = summary.chunks_indexed,
            reports_processed = summary.reports_processed,
            index = self.index.name(),
            "Ingestion complete"
        );

        Ok(summary)
    }
}
