//! Report lists stored as JSON

use super::ReportSource;
use crate::errors::IngestionError;
use async_trait::async_trait;
use cyberrag_common::models::Report;
use std::path::{Path, PathBuf};

/// Write reports as a pretty-printed JSON array
pub async fn save_reports(reports: &[Report], path: impl AsRef<Path>) -> Result<(), IngestionError> {
    let json = serde_json::to_vec_pretty(reports)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Read a JSON array of reports
pub async fn load_reports(path: impl AsRef<Path>) -> Result<Vec<Report>, IngestionError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Serves reports from a JSON file written by [`save_reports`]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSource for JsonFileSource {
    async fn fetch(&self, limit: usize) -> Vec<Report> {
        match load_reports(&self.path).await {
            Ok(mut reports) => {
                reports.truncate(limit);
                reports
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to load reports");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockReportSource;

    #[tokio::test]
    async fn test_save_then_fetch() {
        let path = std::env::temp_dir().join(format!("cyberrag-reports-{}.json", std::process::id()));
        let reports = MockReportSource::reports(3);
        save_reports(&reports, &path).await.unwrap();

        let source = JsonFileSource::new(&path);
        let loaded = source.fetch(2).await;
        assert_eq!(loaded, reports[..2].to_vec());

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty() {
        let source = JsonFileSource::new("/nonexistent/reports.json");
        assert!(source.fetch(10).await.is_empty());
    }
}
