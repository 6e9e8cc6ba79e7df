//! Standard retrieval: embed, then nearest-neighbour search

use super::{retrieval_failed, RetrievalStrategy, RetrievedChunk, StrategyRetriever};
use cyberrag_common::embeddings::EmbeddingProvider;
use cyberrag_common::errors::{AppError, Result};
use cyberrag_common::index::VectorIndex;
use std::sync::Arc;
use std::time::Duration;

/// Vector similarity retriever
#[derive(Clone)]
pub struct VectorRetriever {
    embeddings: EmbeddingProvider,
    index: Arc<dyn VectorIndex>,
    search_timeout: Duration,
}

impl VectorRetriever {
    pub fn new(
        embeddings: EmbeddingProvider,
        index: Arc<dyn VectorIndex>,
        search_timeout: Duration,
    ) -> Self {
        Self {
            embeddings,
            index,
            search_timeout,
        }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Embed `text` and return the `k` closest chunks
    pub async fn search_text(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embeddings.embed_one(text).await.map_err(retrieval_failed)?;

        let hits = tokio::time::timeout(self.search_timeout, self.index.search(&vector, k))
            .await
            .map_err(|_| AppError::RetrievalFailed {
                message: format!(
                    "Search on '{}' timed out after {}ms",
                    self.index.name(),
                    self.search_timeout.as_millis()
                ),
            })?
            .map_err(retrieval_failed)?;

        Ok(hits.into_iter().map(RetrievedChunk::from).collect())
    }
}

#[async_trait::async_trait]
impl StrategyRetriever for VectorRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        self.search_text(query, k).await
    }

    fn strategy(&self) -> RetrievalStrategy {
        RetrievalStrategy::Standard
    }
}
