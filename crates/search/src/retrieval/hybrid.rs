//! Hybrid retrieval
//!
//! There is no sparse/keyword scorer yet, so hybrid runs the standard vector
//! search unchanged.

use super::{RetrievalStrategy, RetrievedChunk, StrategyRetriever, VectorRetriever};
use cyberrag_common::errors::Result;

#[derive(Clone)]
pub struct HybridRetriever {
    vector: VectorRetriever,
}

impl HybridRetriever {
    pub fn new(vector: VectorRetriever) -> Self {
        Self { vector }
    }
}

#[async_trait::async_trait]
impl StrategyRetriever for HybridRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        self.vector.search_text(query, k).await
    }

    fn strategy(&self) -> RetrievalStrategy {
        RetrievalStrategy::Hybrid
    }
}
