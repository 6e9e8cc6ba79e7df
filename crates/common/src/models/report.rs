//! Vulnerability report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A disclosed vulnerability report as produced by a report source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Source identifier (e.g. the HackerOne report id)
    pub id: String,

    pub title: String,

    /// Full text used for chunking
    pub body_text: String,

    #[serde(default = "default_severity")]
    pub severity: String,

    /// Total bounty awarded
    #[serde(default)]
    pub bounty: f64,

    pub published_at: DateTime<Utc>,

    #[serde(default)]
    pub cve: Option<String>,

    #[serde(default)]
    pub attack_vector: Option<String>,

    /// Weakness or technique (CWE name)
    #[serde(default)]
    pub technique: Option<String>,

    pub source_link: String,
}

/// Scalar report fields copied onto every chunk for filtering and citation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub report_id: String,
    pub title: String,
    pub severity: String,
    pub bounty: f64,
    pub published_at: DateTime<Utc>,
    pub cve: Option<String>,
    pub attack_vector: Option<String>,
    pub technique: Option<String>,
    pub link: String,
}

fn default_severity() -> String {
    "unknown".to_string()
}

impl Report {
    /// Flatten the scalar fields into an owned metadata copy
    pub fn metadata(&self) -> ReportMetadata {
        ReportMetadata {
            report_id: self.id.clone(),
            title: self.title.clone(),
            severity: self.severity.clone(),
            bounty: self.bounty,
            published_at: self.published_at,
            cve: self.cve.clone(),
            attack_vector: self.attack_vector.clone(),
            technique: self.technique.clone(),
            link: self.source_link.clone(),
        }
    }
}
