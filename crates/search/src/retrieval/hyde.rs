//! Hypothetical Document Embeddings
//!
//! Short questions sit far from full report text in embedding space. The LLM
//! writes a plausible report excerpt for the question and that excerpt is
//! embedded instead. Without a usable excerpt the query itself is searched.

use super::{RetrievalStrategy, RetrievedChunk, StrategyRetriever, VectorRetriever};
use cyberrag_common::errors::Result;
use cyberrag_common::llm::LlmClient;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HydeRetriever {
    vector: VectorRetriever,
    llm: Option<LlmClient>,
}

impl HydeRetriever {
    pub fn new(vector: VectorRetriever, llm: Option<LlmClient>) -> Self {
        Self { vector, llm }
    }

    /// The hypothetical document, or `None` when the LLM cannot provide one
    async fn hypothetical_document(&self, query: &str) -> Option<String> {
        let llm = self.llm.as_ref()?;

        match llm.complete(&hyde_prompt(query)).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(chars = text.chars().count(), "Generated hypothetical document");
                Some(text)
            }
            Ok(_) => {
                warn!("LLM returned an empty hypothetical document, using the query");
                None
            }
            Err(e) => {
                warn!(error = %e, "HyDE generation failed, falling back to standard search");
                None
            }
        }
    }
}

fn hyde_prompt(query: &str) -> String {
    format!(
        "Write a technical excerpt of a vulnerability report or exploit that answers: {}",
        query
    )
}

#[async_trait::async_trait]
impl StrategyRetriever for HydeRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        match self.hypothetical_document(query).await {
            Some(document) => self.vector.search_text(&document, k).await,
            None => self.vector.search_text(query, k).await,
        }
    }

    fn strategy(&self) -> RetrievalStrategy {
        RetrievalStrategy::Hyde
    }
}
