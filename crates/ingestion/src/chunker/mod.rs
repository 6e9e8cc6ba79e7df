//! Text chunking
//!
//! Splits report text into indexable chunks under the configured size and
//! overlap policy. Strategies that depend on an external model (semantic,
//! agentic) degrade to recursive splitting whenever that model is missing or
//! fails, so chunking itself never fails.

mod agentic;
mod recursive;
mod semantic;

pub use recursive::RecursiveSplitter;

use cyberrag_common::config::ChunkingConfig;
use cyberrag_common::embeddings::EmbeddingProvider;
use cyberrag_common::errors::{AppError, Result};
use cyberrag_common::llm::LlmClient;
use cyberrag_common::models::{Chunk, ReportMetadata};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{instrument, warn};

/// How report text is split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    #[default]
    Recursive,
    #[serde(alias = "page")]
    WholeDocument,
    Semantic,
    Agentic,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::Recursive => "recursive",
            ChunkingStrategy::WholeDocument => "whole_document",
            ChunkingStrategy::Semantic => "semantic",
            ChunkingStrategy::Agentic => "agentic",
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "recursive" => Ok(ChunkingStrategy::Recursive),
            "whole_document" | "page" => Ok(ChunkingStrategy::WholeDocument),
            "semantic" => Ok(ChunkingStrategy::Semantic),
            "agentic" => Ok(ChunkingStrategy::Agentic),
            other => Err(AppError::configuration(format!(
                "Unknown chunking strategy '{}'",
                other
            ))),
        }
    }
}

/// Chunking engine with optional model collaborators
#[derive(Clone)]
pub struct ChunkingEngine {
    splitter: RecursiveSplitter,
    whole_document_threshold: usize,
    breakpoint_percentile: f32,
    embeddings: Option<EmbeddingProvider>,
    llm: Option<LlmClient>,
}

impl ChunkingEngine {
    /// Fails with a configuration error unless `0 <= chunk_overlap < chunk_size`
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            splitter: RecursiveSplitter::new(config.chunk_size, config.chunk_overlap)?,
            whole_document_threshold: config.whole_document_threshold(),
            breakpoint_percentile: config.breakpoint_percentile,
            embeddings: None,
            llm: None,
        })
    }

    /// Embedding provider used by the semantic strategy
    pub fn with_embeddings(mut self, embeddings: EmbeddingProvider) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// LLM used by the agentic strategy
    pub fn with_llm(mut self, llm: Option<LlmClient>) -> Self {
        self.llm = llm;
        self
    }

    /// Split `text` into ordered chunks carrying a copy of `metadata`
    #[instrument(skip(self, text, metadata), fields(report_id = %metadata.report_id))]
    pub async fn chunk(
        &self,
        text: &str,
        metadata: &ReportMetadata,
        strategy: ChunkingStrategy,
    ) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = match strategy {
            ChunkingStrategy::Recursive => self.splitter.split(text),
            ChunkingStrategy::WholeDocument => self.whole_document(text),
            ChunkingStrategy::Semantic => self.semantic(text).await,
            ChunkingStrategy::Agentic => self.agentic(text).await,
        };

        pieces
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Chunk {
                text,
                source_report_id: metadata.report_id.clone(),
                ordinal,
                metadata: metadata.clone(),
            })
            .collect()
    }

    fn whole_document(&self, text: &str) -> Vec<String> {
        let length = text.chars().count();
        if length <= self.whole_document_threshold {
            return vec![text.to_string()];
        }
        warn!(
            length,
            threshold = self.whole_document_threshold,
            "Document too long to keep whole, splitting recursively"
        );
        self.splitter.split(text)
    }

    async fn semantic(&self, text: &str) -> Vec<String> {
        let Some(embeddings) = &self.embeddings else {
            warn!("No embedding provider for semantic chunking, using recursive");
            return self.splitter.split(text);
        };

        match semantic::split(text, embeddings, self.breakpoint_percentile, &self.splitter).await {
            Ok(pieces) => pieces,
            Err(e) => {
                warn!(error = %e, "Semantic chunking failed, using recursive");
                self.splitter.split(text)
            }
        }
    }

    async fn agentic(&self, text: &str) -> Vec<String> {
        let Some(llm) = &self.llm else {
            warn!("No LLM for agentic chunking, using recursive");
            return self.splitter.split(text);
        };

        match agentic::split(text, llm, &self.splitter).await {
            Ok(pieces) => pieces,
            Err(e) => {
                warn!(error = %e, "Agentic chunking failed, using recursive");
                self.splitter.split(text)
            }
        }
    }
}

/// Split text into sentences.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace, or at a newline.
/// Trailing whitespace stays with the sentence, so the pieces concatenate back
/// to the input.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next_is_space = chars.peek().map(|(_, n)| n.is_whitespace()).unwrap_or(false);
        let terminates = c == '\n' || (matches!(c, '.' | '!' | '?') && next_is_space);
        if !terminates {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, n)) = chars.peek() {
            if !n.is_whitespace() {
                break;
            }
            end = j + n.len_utf8();
            chars.next();
        }

        if !text[start..end].trim().is_empty() {
            sentences.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

/// Split grouped sentence text, re-splitting oversized groups
pub(crate) fn pack_groups(groups: Vec<String>, splitter: &RecursiveSplitter) -> Vec<String> {
    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        if group.trim().is_empty() {
            continue;
        }
        if group.chars().count() > splitter.chunk_size() {
            out.extend(splitter.split(&group));
        } else {
            out.push(group);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyberrag_common::embeddings::HashingEmbedder;
    use cyberrag_common::llm::MockLlm;
    use std::sync::Arc;
    use std::time::Duration;

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            report_id: "H1-100000".to_string(),
            title: "Stored XSS in Comments Section 0".to_string(),
            severity: "High".to_string(),
            bounty: 500.0,
            published_at: "2026-01-15T00:00:00Z".parse().unwrap(),
            cve: Some("CVE-2026-1000".to_string()),
            attack_vector: Some("Web".to_string()),
            technique: Some("Stored XSS".to_string()),
            link: "https://hackerone.com/reports/100000".to_string(),
        }
    }

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            chunk_overlap,
            ..ChunkingConfig::default()
        }
    }

    fn long_text() -> String {
        "The comment field accepts raw HTML. A script tag executes in every viewer's browser! \
         Session cookies are not HttpOnly. Can the attacker steal them? Yes, trivially.\n"
            .repeat(10)
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("page".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::WholeDocument);
        assert_eq!("Semantic".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::Semantic);
        assert!("sliding".parse::<ChunkingStrategy>().is_err());
        assert_eq!(ChunkingStrategy::Agentic.to_string(), "agentic");
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let err = ChunkingEngine::new(&config(100, 100)).err().unwrap();
        assert!(err.is_configuration());
        assert!(ChunkingEngine::new(&config(0, 0)).is_err());
    }

    #[tokio::test]
    async fn test_short_text_single_chunk() {
        let engine = ChunkingEngine::new(&config(1000, 200)).unwrap();
        let text = "Stored XSS via the comment preview.";
        let chunks = engine.chunk(text, &metadata(), ChunkingStrategy::Recursive).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].source_report_id, "H1-100000");
        assert_eq!(chunks[0].metadata, metadata());
    }

    #[tokio::test]
    async fn test_whitespace_yields_nothing() {
        let engine = ChunkingEngine::new(&config(100, 10)).unwrap();
        for strategy in [
            ChunkingStrategy::Recursive,
            ChunkingStrategy::WholeDocument,
            ChunkingStrategy::Semantic,
            ChunkingStrategy::Agentic,
        ] {
            assert!(engine.chunk("   \n ", &metadata(), strategy).await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_whole_document_respects_threshold() {
        let engine = ChunkingEngine::new(&config(200, 20)).unwrap();
        let short = "One short report.";
        let chunks = engine.chunk(short, &metadata(), ChunkingStrategy::WholeDocument).await;
        assert_eq!(chunks.len(), 1);

        let text = long_text();
        let chunks = engine.chunk(&text, &metadata(), ChunkingStrategy::WholeDocument).await;
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 200));
    }

    #[tokio::test]
    async fn test_semantic_without_provider_matches_recursive() {
        let engine = ChunkingEngine::new(&config(200, 20)).unwrap();
        let text = long_text();
        let semantic = engine.chunk(&text, &metadata(), ChunkingStrategy::Semantic).await;
        let recursive = engine.chunk(&text, &metadata(), ChunkingStrategy::Recursive).await;
        assert_eq!(semantic, recursive);
    }

    #[tokio::test]
    async fn test_semantic_with_provider_bounds_chunks() {
        let provider = EmbeddingProvider::new(Arc::new(HashingEmbedder::new(64)), Duration::from_secs(5));
        let engine = ChunkingEngine::new(&config(200, 20))
            .unwrap()
            .with_embeddings(provider);
        let text = long_text();
        let chunks = engine.chunk(&text, &metadata(), ChunkingStrategy::Semantic).await;
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 200));
        let ordinals: Vec<usize> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_agentic_failure_matches_recursive() {
        let llm = LlmClient::new(Arc::new(MockLlm::failing()), Duration::from_secs(1));
        let engine = ChunkingEngine::new(&config(200, 20)).unwrap().with_llm(Some(llm));
        let text = long_text();
        let agentic = engine.chunk(&text, &metadata(), ChunkingStrategy::Agentic).await;
        let recursive = engine.chunk(&text, &metadata(), ChunkingStrategy::Recursive).await;
        assert_eq!(agentic, recursive);
    }

    #[test]
    fn test_split_sentences_concatenates_back() {
        let text = "  First one. Second!\nThird? fourth without end";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences.concat(), text);
        assert_eq!(sentences[1], "Second!\n");
    }

    #[test]
    fn test_split_sentences_keeps_decimals_together() {
        let sentences = split_sentences("Version 2.4.1 is affected. Upgrade now.");
        assert_eq!(sentences, vec!["Version 2.4.1 is affected. ", "Upgrade now."]);
    }
}
