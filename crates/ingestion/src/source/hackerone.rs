//! HackerOne hacktivity API client

use super::ReportSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cyberrag_common::config::SourceConfig;
use cyberrag_common::errors::{AppError, Result};
use cyberrag_common::models::Report;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HackerOneClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

#[derive(Debug, Default, Deserialize)]
struct HacktivityPage {
    #[serde(default)]
    data: Vec<HacktivityItem>,
}

#[derive(Debug, Default, Deserialize)]
struct HacktivityItem {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    attributes: ItemAttributes,
    #[serde(default)]
    relationships: Relationships,
}

#[derive(Debug, Default, Deserialize)]
struct ItemAttributes {
    title: Option<String>,
    severity_rating: Option<String>,
    cwe: Option<String>,
    cve_ids: Option<Vec<String>>,
    votes: Option<i64>,
    total_awarded_amount: Option<f64>,
    url: Option<String>,
    disclosed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct Relationships {
    #[serde(default)]
    program: Related<ProgramAttributes>,
    #[serde(default)]
    reporter: Related<ReporterAttributes>,
}

#[derive(Debug, Deserialize)]
struct Related<T> {
    data: Option<RelatedData<T>>,
}

impl<T> Default for Related<T> {
    fn default() -> Self {
        Self { data: None }
    }
}

#[derive(Debug, Deserialize)]
struct RelatedData<T> {
    attributes: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ProgramAttributes {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReporterAttributes {
    username: Option<String>,
}

impl<T> Related<T> {
    fn attributes(&self) -> Option<&T> {
        self.data.as_ref().and_then(|d| d.attributes.as_ref())
    }
}

impl HackerOneClient {
    pub fn new(base_url: impl Into<String>, credentials: Option<(String, String)>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Credentials come from `source.api_identifier`/`source.api_token`, or the
    /// `HACKERONE_API_IDENTIFIER`/`HACKERONE_API_TOKEN` environment variables
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let identifier = config
            .api_identifier
            .clone()
            .or_else(|| std::env::var("HACKERONE_API_IDENTIFIER").ok());
        let token = config
            .api_token
            .clone()
            .or_else(|| std::env::var("HACKERONE_API_TOKEN").ok());

        let credentials = match (identifier, token) {
            (Some(id), Some(token)) => Some((id, token)),
            _ => {
                warn!("HackerOne API credentials not configured; API fetches will return nothing");
                None
            }
        };

        Self::new(config.base_url.clone(), credentials)
    }

    async fn try_fetch(&self, limit: usize) -> Result<Vec<Report>> {
        let Some((identifier, token)) = &self.credentials else {
            return Err(AppError::Source {
                message: "missing API credentials".to_string(),
            });
        };

        let url = format!("{}/hackers/hacktivity", self.base_url);
        info!(url = %url, limit, "Fetching HackerOne hacktivity");

        let response = self
            .client
            .get(&url)
            .basic_auth(identifier, Some(token))
            .query(&[
                ("page[size]", limit.to_string()),
                ("queryString", "disclosed:true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Source {
                message: format!("Request failed: {}", e),
            })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::Source {
                message: "authentication failed, check the API identifier and token".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(AppError::Source {
                message: format!("API error {}", response.status()),
            });
        }

        let page: HacktivityPage = response.json().await.map_err(|e| AppError::Source {
            message: format!("Failed to parse response: {}", e),
        })?;

        Ok(page.data.into_iter().map(into_report).collect())
    }
}

#[async_trait]
impl ReportSource for HackerOneClient {
    async fn fetch(&self, limit: usize) -> Vec<Report> {
        match self.try_fetch(limit).await {
            Ok(reports) => {
                info!(count = reports.len(), "Fetched reports from HackerOne API");
                reports
            }
            Err(e) => {
                error!(error = %e, "HackerOne API fetch failed");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &str {
        "hackerone"
    }
}

fn item_id(id: Option<&serde_json::Value>) -> String {
    match id {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => "unknown".to_string(),
    }
}

fn into_report(item: HacktivityItem) -> Report {
    let id = item_id(item.id.as_ref());
    let attr = item.attributes;

    let title = attr.title.unwrap_or_else(|| "Untitled".to_string());
    let severity = attr.severity_rating.unwrap_or_else(|| "unknown".to_string());
    let cves = attr.cve_ids.unwrap_or_default();
    let cve = (!cves.is_empty()).then(|| cves.join(", "));
    let link = attr
        .url
        .unwrap_or_else(|| format!("https://hackerone.com/reports/{}", id));
    let bounty = attr.total_awarded_amount.unwrap_or(0.0);
    let program = item
        .relationships
        .program
        .attributes()
        .and_then(|p| p.name.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let reporter = item
        .relationships
        .reporter
        .attributes()
        .and_then(|r| r.username.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    let body_text = format!(
        "Title: {}\nSeverity: {}\nWeakness/CWE: {}\nCVEs: {}\nProgram: {}\nReporter: {}\nVotes: {}\nBounty Awarded: ${}\nURL: {}",
        title,
        severity,
        attr.cwe.as_deref().unwrap_or("N/A"),
        cve.as_deref().unwrap_or("N/A"),
        program,
        reporter,
        attr.votes.unwrap_or(0),
        bounty,
        link,
    );

    Report {
        id,
        title,
        body_text,
        severity,
        bounty,
        published_at: attr.disclosed_at.unwrap_or_else(Utc::now),
        cve,
        attack_vector: Some("Web".to_string()),
        technique: attr.cwe,
        source_link: link,
    }
}
