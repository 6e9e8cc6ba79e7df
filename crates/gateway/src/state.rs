//! Shared application state

use cyberrag_common::{
    config::AppConfig,
    embeddings::EmbeddingProvider,
    errors::{AppError, Result},
    index::{create_index, VectorIndex},
    llm::LlmClient,
};
use cyberrag_ingestion::{
    source::create_source, ChunkingEngine, ChunkingStrategy, IngestionCoordinator, ReportSource,
};
use cyberrag_search::QueryPipeline;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub coordinator: Arc<IngestionCoordinator>,
    pub pipeline: QueryPipeline,
    pub source: Arc<dyn ReportSource>,
    pub embeddings: EmbeddingProvider,
    pub llm: Option<LlmClient>,
}

impl AppState {
    /// Build every capability from configuration
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let embeddings = EmbeddingProvider::from_config(&config.embedding)?;
        let llm = LlmClient::from_config(&config.llm)?;
        let index = create_index(&config.index, config.embedding.dimension)?;
        let source = create_source(&config.source)?;
        Self::build(config, embeddings, index, llm, source)
    }

    /// Wire the pipeline around explicitly supplied capabilities
    pub fn build(
        config: AppConfig,
        embeddings: EmbeddingProvider,
        index: Arc<dyn VectorIndex>,
        llm: Option<LlmClient>,
        source: Arc<dyn ReportSource>,
    ) -> Result<Self> {
        let strategy: ChunkingStrategy = config.chunking.strategy.parse()?;
        let chunker = ChunkingEngine::new(&config.chunking)?
            .with_embeddings(embeddings.clone())
            .with_llm(llm.clone());
        let coordinator =
            IngestionCoordinator::new(chunker, embeddings.clone(), index.clone(), strategy)
                .map_err(AppError::from)?;
        let pipeline = QueryPipeline::from_config(&config, embeddings.clone(), index, llm.clone());

        Ok(Self {
            config: Arc::new(config),
            coordinator: Arc::new(coordinator),
            pipeline,
            source,
            embeddings,
            llm,
        })
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        self.coordinator.index()
    }
}
