//! Deterministic sample reports for offline runs

use super::ReportSource;
use async_trait::async_trait;
use chrono::Utc;
use cyberrag_common::models::Report;

const BODY: &str = "This is a detailed report about a Stored XSS vulnerability found in the \
comments section. The attacker can inject malicious scripts... \
Payload: <script>alert(1)</script>. Mitigation: sanitize input.";

/// Stored-XSS sample reports `H1-100000`, `H1-100001`, ...
pub struct MockReportSource;

impl MockReportSource {
    pub fn reports(count: usize) -> Vec<Report> {
        (0..count)
            .map(|i| {
                let number = 100_000 + i;
                Report {
                    id: format!("H1-{}", number),
                    title: format!("Stored XSS in Comments Section {}", i),
                    body_text: BODY.to_string(),
                    severity: "High".to_string(),
                    bounty: 500.0 * (i + 1) as f64,
                    published_at: Utc::now(),
                    cve: Some(format!("CVE-2026-100{}", i)),
                    attack_vector: Some("Web".to_string()),
                    technique: Some("Stored XSS".to_string()),
                    source_link: format!("https://hackerone.com/reports/{}", number),
                }
            })
            .collect()
    }
}

#[async_trait]
impl ReportSource for MockReportSource {
    async fn fetch(&self, limit: usize) -> Vec<Report> {
        tracing::info!(count = limit, "Generating mock reports");
        Self::reports(limit)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
