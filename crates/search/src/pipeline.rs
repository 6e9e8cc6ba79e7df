//! Query pipeline: route → retrieve → answer

use crate::answer::{Answer, AnswerGenerator};
use crate::retrieval::{RetrievalStrategy, RetrievedChunk, Retriever};
use crate::router::{QueryRouter, RouteDecision};
use cyberrag_common::config::AppConfig;
use cyberrag_common::embeddings::EmbeddingProvider;
use cyberrag_common::errors::Result;
use cyberrag_common::index::VectorIndex;
use cyberrag_common::llm::LlmClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Everything produced while answering one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub query: String,
    pub route: RouteDecision,

    /// Strategy used, `None` when retrieval was skipped
    pub strategy: Option<RetrievalStrategy>,

    pub context: Vec<RetrievedChunk>,

    /// Set when retrieval failed and the answer was generated without context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_error: Option<String>,

    pub answer: Answer,
}

#[derive(Clone)]
pub struct QueryPipeline {
    router: QueryRouter,
    retriever: Retriever,
    generator: AnswerGenerator,
    default_k: usize,
}

impl QueryPipeline {
    pub fn new(
        router: QueryRouter,
        retriever: Retriever,
        generator: AnswerGenerator,
        default_k: usize,
    ) -> Self {
        Self {
            router,
            retriever,
            generator,
            default_k,
        }
    }

    /// Wire router, retriever and generator around shared capability handles
    pub fn from_config(
        config: &AppConfig,
        embeddings: EmbeddingProvider,
        index: Arc<dyn VectorIndex>,
        llm: Option<LlmClient>,
    ) -> Self {
        Self::new(
            QueryRouter::new(llm.clone()),
            Retriever::from_config(&config.retrieval, embeddings, index, llm.clone()),
            AnswerGenerator::new(llm),
            config.retrieval.default_k,
        )
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Strategy for a route; `None` means answer without retrieval
    pub fn strategy_for(route: RouteDecision) -> Option<RetrievalStrategy> {
        match route {
            RouteDecision::KnowledgeBase => Some(RetrievalStrategy::Hyde),
            RouteDecision::WebSearch => Some(RetrievalStrategy::Standard),
            RouteDecision::DirectAnswer => None,
        }
    }

    pub async fn run(&self, query: &str) -> Result<QueryOutcome> {
        self.run_with_k(query, self.default_k).await
    }

    /// Answer a query. Retrieval failures degrade to an ungrounded answer;
    /// answer generation failures propagate.
    #[instrument(skip(self))]
    pub async fn run_with_k(&self, query: &str, k: usize) -> Result<QueryOutcome> {
        let route = self.router.route(query).await;
        let strategy = Self::strategy_for(route);

        if route == RouteDecision::WebSearch {
            warn!("Web search is not available, using the knowledge base");
        }

        let mut retrieval_error = None;
        let context = match strategy {
            Some(strategy) => match self.retriever.retrieve(query, strategy, k).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!(error = %e, "Retrieval failed, answering without context");
                    retrieval_error = Some(e.to_string());
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let answer = self.generator.generate(query, &context).await?;

        info!(
            route = %route,
            context = context.len(),
            grounded = answer.grounded,
            "Query answered"
        );

        Ok(QueryOutcome {
            query: query.to_string(),
            route,
            strategy,
            context,
            retrieval_error,
            answer,
        })
    }
}
