//! CyberRAG Search CLI
//!
//! Answers one question against the knowledge base:
//!
//! ```text
//! search [--ingest] ["<question>"]
//! ```
//!
//! `--ingest` first fetches reports from the configured source and indexes
//! them, which is required when the index backend is the in-memory one.

use cyberrag_common::{
    config::AppConfig, embeddings::EmbeddingProvider, index::create_index, llm::LlmClient,
    telemetry, VERSION,
};
use cyberrag_ingestion::{source::create_source, ChunkingEngine, IngestionCoordinator};
use cyberrag_search::QueryPipeline;
use tracing::{info, warn};

const DEFAULT_QUERY: &str = "Quais técnicas de XSS recentes foram encontradas?";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    telemetry::init_tracing(&config.observability);
    config.validate()?;

    info!("Starting CyberRAG Search v{}", VERSION);

    let mut ingest = false;
    let mut query = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--ingest" => ingest = true,
            _ => query = Some(arg),
        }
    }
    let query = query.unwrap_or_else(|| DEFAULT_QUERY.to_string());

    let embeddings = EmbeddingProvider::from_config(&config.embedding)?;
    let llm = LlmClient::from_config(&config.llm)?;
    let index = create_index(&config.index, config.embedding.dimension)?;

    if ingest {
        let chunker = ChunkingEngine::new(&config.chunking)?
            .with_embeddings(embeddings.clone())
            .with_llm(llm.clone());
        let coordinator = IngestionCoordinator::new(
            chunker,
            embeddings.clone(),
            index.clone(),
            config.chunking.strategy.parse()?,
        )?;
        let source = create_source(&config.source)?;
        let reports = source.fetch(config.source.fetch_limit).await;
        let summary = coordinator.ingest(&reports).await?;
        info!(
            reports = summary.reports_processed,
            chunks = summary.chunks_indexed,
            "Knowledge base loaded"
        );
    }

    if index.count().await? == 0 {
        warn!(index = index.name(), "Index is empty, answers will be ungrounded");
    }

    let pipeline = QueryPipeline::from_config(&config, embeddings, index, llm);
    let outcome = pipeline.run(&query).await?;

    println!("Question: {}", outcome.query);
    println!("Route: {}", outcome.route);
    if let Some(strategy) = outcome.strategy {
        println!("Strategy: {}", strategy);
    }
    if let Some(error) = &outcome.retrieval_error {
        println!("Retrieval failed: {}", error);
    }
    if !outcome.answer.sources.is_empty() {
        println!("\nSources:");
        for (i, source) in outcome.answer.sources.iter().enumerate() {
            println!("  [{}] {} ({}) {}", i + 1, source.title, source.severity, source.link);
        }
    }
    println!("\n{}", outcome.answer.text);
    if !outcome.answer.grounded {
        println!("\n(answer not grounded in indexed reports)");
    }

    Ok(())
}
