//! CyberRAG Ingestion Service
//!
//! Periodically pulls disclosed reports from the configured source and indexes them:
//! 1. Fetches up to `source.fetch_limit` reports
//! 2. Chunks them with the configured strategy
//! 3. Embeds and upserts the chunks
//!
//! Runs once and exits when `source.schedule_interval_secs` is 0 or `--once` is given.
//! `--save <path>` also writes every fetched batch to a JSON file.

use backoff::ExponentialBackoff;
use cyberrag_common::{
    config::AppConfig, embeddings::EmbeddingProvider, index::create_index, llm::LlmClient,
    telemetry, VERSION,
};
use cyberrag_ingestion::{
    source::{create_source, save_reports},
    ChunkingEngine, ChunkingStrategy, IngestionCoordinator, IngestionError, IngestionSummary,
    ReportSource,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

struct Args {
    once: bool,
    save: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args {
        once: false,
        save: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--once" => args.once = true,
            "--save" => args.save = iter.next().map(PathBuf::from),
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
    }
    args
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    telemetry::init_tracing(&config.observability);
    config.validate()?;

    info!("Starting CyberRAG Ingestion Service v{}", VERSION);
    let args = parse_args();

    let embeddings = EmbeddingProvider::from_config(&config.embedding)?;
    let llm = LlmClient::from_config(&config.llm)?;
    let index = create_index(&config.index, config.embedding.dimension)?;

    let strategy: ChunkingStrategy = config.chunking.strategy.parse()?;
    let chunker = ChunkingEngine::new(&config.chunking)?
        .with_embeddings(embeddings.clone())
        .with_llm(llm);
    let coordinator = IngestionCoordinator::new(chunker, embeddings, index, strategy)?;
    let source = create_source(&config.source)?;

    info!(
        strategy = %strategy,
        index = coordinator.index().name(),
        limit = config.source.fetch_limit,
        "Ingestion pipeline ready"
    );

    let interval = config.source.schedule_interval_secs;
    let run_once_only = args.once || interval == 0;
    if is_ephemeral_schedule(&config.index.backend, run_once_only) {
        warn!(
            backend = %config.index.backend,
            "Scheduled ingestion writes to the in-memory index, which is lost on exit; \
             set index.backend = \"qdrant\" to persist it"
        );
    }

    if run_once_only {
        run_once(&coordinator, source.as_ref(), config.source.fetch_limit, args.save.as_ref())
            .await?;
        return Ok(());
    }

    info!(interval_secs = interval, "Scheduler started");
    let mut ticker = tokio::time::interval(Duration::from_secs(interval));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_once(&coordinator, source.as_ref(), config.source.fetch_limit, args.save.as_ref()).await {
                    Ok(_) => {}
                    Err(e) if e.is_retryable() => {
                        error!(error = %e, "Scheduled ingestion failed, waiting for next run");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ingestion service shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// A long-running schedule writing to the process-local index
fn is_ephemeral_schedule(backend: &str, run_once_only: bool) -> bool {
    backend == "memory" && !run_once_only
}

/// Fetch one batch and ingest it, retrying transient failures with exponential backoff
async fn run_once(
    coordinator: &IngestionCoordinator,
    source: &dyn ReportSource,
    limit: usize,
    save: Option<&PathBuf>,
) -> Result<IngestionSummary, IngestionError> {
    info!(source = source.name(), "Checking for new reports");
    let reports = source.fetch(limit).await;

    if reports.is_empty() {
        info!("No reports fetched");
        return Ok(IngestionSummary::default());
    }

    if let Some(path) = save {
        save_reports(&reports, path).await?;
        info!(path = %path.display(), count = reports.len(), "Saved fetched reports");
    }

    let policy = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(120)),
        ..ExponentialBackoff::default()
    };

    let reports = &reports;
    backoff::future::retry(policy, move || async move {
        coordinator.ingest(reports).await.map_err(|e| {
            if e.is_retryable() {
                warn!(error = %e, "Ingestion failed, retrying");
                backoff::Error::transient(e)
            } else {
                backoff::Error::permanent(e)
            }
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_schedule_detection() {
        assert!(is_ephemeral_schedule("memory", false));
        assert!(!is_ephemeral_schedule("memory", true));
        assert!(!is_ephemeral_schedule("qdrant", false));
    }
}
