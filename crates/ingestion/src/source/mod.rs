//! Report sources
//!
//! A source never fails its caller: errors are logged and produce an empty
//! batch, which ingestion treats as nothing to do.

mod file;
mod hackerone;
mod mock;

pub use file::{load_reports, save_reports, JsonFileSource};
pub use hackerone::HackerOneClient;
pub use mock::MockReportSource;

use async_trait::async_trait;
use cyberrag_common::config::SourceConfig;
use cyberrag_common::errors::{AppError, Result};
use cyberrag_common::models::Report;
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch up to `limit` reports
    async fn fetch(&self, limit: usize) -> Vec<Report>;

    fn name(&self) -> &str;
}

/// Uses the primary source and switches to the fallback when it returns nothing
pub struct FallbackSource {
    primary: Arc<dyn ReportSource>,
    fallback: Arc<dyn ReportSource>,
}

impl FallbackSource {
    pub fn new(primary: Arc<dyn ReportSource>, fallback: Arc<dyn ReportSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ReportSource for FallbackSource {
    async fn fetch(&self, limit: usize) -> Vec<Report> {
        let reports = self.primary.fetch(limit).await;
        if !reports.is_empty() {
            return reports;
        }

        warn!(
            primary = self.primary.name(),
            fallback = self.fallback.name(),
            "Primary source returned no reports, switching to fallback"
        );
        self.fallback.fetch(limit).await
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

/// Build the configured source.
///
/// `api` falls back to mock data when the API yields nothing.
pub fn create_source(config: &SourceConfig) -> Result<Arc<dyn ReportSource>> {
    let source: Arc<dyn ReportSource> = match config.method.as_str() {
        "mock" => Arc::new(MockReportSource),
        "api" => {
            let client = HackerOneClient::from_config(config)?;
            Arc::new(FallbackSource::new(Arc::new(client), Arc::new(MockReportSource)))
        }
        "file" => {
            let path = config.file_path.clone().ok_or_else(|| {
                AppError::configuration("source.file_path is required for the file source")
            })?;
            Arc::new(JsonFileSource::new(path))
        }
        other => {
            return Err(AppError::configuration(format!(
                "Unknown report source '{}'",
                other
            )))
        }
    };

    info!(method = %config.method, "Report source configured");
    Ok(source)
}
