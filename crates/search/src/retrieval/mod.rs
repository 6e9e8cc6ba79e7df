//! Multi-strategy retrieval
//!
//! Three strategies over the same vector index:
//! - Standard: embed the query and search
//! - Hybrid: currently the same as Standard (no lexical component)
//! - HyDE: search with the embedding of an LLM-written hypothetical report
//!
//! Embedding and index failures surface as `RetrievalFailed`; an empty result
//! means nothing relevant was found.

mod hybrid;
mod hyde;
mod vector;

pub use hybrid::HybridRetriever;
pub use hyde::HydeRetriever;
pub use vector::VectorRetriever;

use cyberrag_common::config::RetrievalConfig;
use cyberrag_common::embeddings::EmbeddingProvider;
use cyberrag_common::errors::{AppError, Result};
use cyberrag_common::index::VectorIndex;
use cyberrag_common::llm::LlmClient;
use cyberrag_common::metrics;
use cyberrag_common::models::{ReportMetadata, ScoredPayload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Retrieved chunk with relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub record_id: Uuid,

    /// Chunk content
    pub chunk_text: String,

    /// Chunk position within its report
    pub ordinal: usize,

    pub metadata: ReportMetadata,

    /// Cosine similarity to the search vector
    pub score: f32,
}

impl From<ScoredPayload> for RetrievedChunk {
    fn from(hit: ScoredPayload) -> Self {
        Self {
            record_id: hit.record_id,
            chunk_text: hit.payload.chunk_text,
            ordinal: hit.payload.ordinal,
            metadata: hit.payload.metadata,
            score: hit.score,
        }
    }
}

/// Retrieval strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Query embedding similarity
    #[default]
    Standard,
    /// Alias of Standard
    Hybrid,
    /// Hypothetical document embedding
    Hyde,
}

impl RetrievalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalStrategy::Standard => "standard",
            RetrievalStrategy::Hybrid => "hybrid",
            RetrievalStrategy::Hyde => "hyde",
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(RetrievalStrategy::Standard),
            "hybrid" => Ok(RetrievalStrategy::Hybrid),
            "hyde" => Ok(RetrievalStrategy::Hyde),
            other => Err(AppError::Validation {
                message: format!("Unknown retrieval strategy '{}'", other),
                field: Some("strategy".to_string()),
            }),
        }
    }
}

/// Common trait for the per-strategy retrievers
#[async_trait::async_trait]
pub trait StrategyRetriever: Send + Sync {
    /// Retrieve up to `k` chunks for the query
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Strategy implemented by this retriever
    fn strategy(&self) -> RetrievalStrategy;
}

/// Entry point dispatching a query to the requested strategy
#[derive(Clone)]
pub struct Retriever {
    standard: VectorRetriever,
    hybrid: HybridRetriever,
    hyde: HydeRetriever,
}

impl Retriever {
    pub fn new(
        embeddings: EmbeddingProvider,
        index: Arc<dyn VectorIndex>,
        llm: Option<LlmClient>,
        search_timeout: Duration,
    ) -> Self {
        let standard = VectorRetriever::new(embeddings, index, search_timeout);
        Self {
            hybrid: HybridRetriever::new(standard.clone()),
            hyde: HydeRetriever::new(standard.clone(), llm),
            standard,
        }
    }

    pub fn from_config(
        config: &RetrievalConfig,
        embeddings: EmbeddingProvider,
        index: Arc<dyn VectorIndex>,
        llm: Option<LlmClient>,
    ) -> Self {
        Self::new(embeddings, index, llm, config.search_timeout())
    }

    /// Underlying index handle
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        self.standard.index()
    }

    /// Retrieve up to `k` chunks ordered by descending score
    #[instrument(skip(self), fields(strategy = %strategy))]
    pub async fn retrieve(
        &self,
        query: &str,
        strategy: RetrievalStrategy,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let start = Instant::now();

        let retriever: &dyn StrategyRetriever = match strategy {
            RetrievalStrategy::Standard => &self.standard,
            RetrievalStrategy::Hybrid => &self.hybrid,
            RetrievalStrategy::Hyde => &self.hyde,
        };

        let chunks = retriever.retrieve(query, k).await?;

        metrics::record_search(
            start.elapsed().as_secs_f64(),
            retriever.strategy().as_str(),
            chunks.len(),
        );
        debug!(results = chunks.len(), "Retrieval complete");

        Ok(chunks)
    }
}

/// Map embedding and index errors onto `RetrievalFailed`.
///
/// Configuration errors pass through unchanged.
pub(crate) fn retrieval_failed(err: AppError) -> AppError {
    if err.is_configuration() || matches!(err, AppError::RetrievalFailed { .. }) {
        return err;
    }
    AppError::RetrievalFailed {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("hyde".parse::<RetrievalStrategy>().unwrap(), RetrievalStrategy::Hyde);
        assert_eq!(" Standard ".parse::<RetrievalStrategy>().unwrap(), RetrievalStrategy::Standard);
        assert!("bm25".parse::<RetrievalStrategy>().is_err());
        assert_eq!(RetrievalStrategy::default(), RetrievalStrategy::Standard);
    }

    #[test]
    fn test_retrieval_failed_mapping() {
        let err = retrieval_failed(AppError::Index {
            message: "connection reset".to_string(),
        });
        assert!(matches!(err, AppError::RetrievalFailed { .. }));

        let err = retrieval_failed(AppError::EmbeddingTimeout { timeout_ms: 100 });
        assert!(matches!(err, AppError::RetrievalFailed { .. }));

        let err = retrieval_failed(AppError::DimensionMismatch {
            expected: 384,
            actual: 768,
        });
        assert!(err.is_configuration());
    }
}
