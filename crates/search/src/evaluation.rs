//! Retrieval evaluation
//!
//! Generates test questions from a report with the LLM, then checks whether
//! standard retrieval brings back a chunk containing an expected snippet.

use crate::retrieval::{RetrievalStrategy, Retriever};
use cyberrag_common::errors::Result;
use cyberrag_common::llm::LlmClient;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Characters of report text shown to the question generator
const QUESTION_CONTEXT_CHARS: usize = 2000;

/// Results inspected per question
const EVALUATION_TOP_K: usize = 3;

/// A question and a snippet the right chunk must contain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCase {
    pub question: String,
    pub expected_snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub question: String,
    pub hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total: usize,
    pub hits: usize,
    pub hit_rate: f64,
    pub results: Vec<CaseResult>,
}

pub struct RetrievalEvaluator {
    retriever: Retriever,
    llm: Option<LlmClient>,
}

impl RetrievalEvaluator {
    pub fn new(retriever: Retriever, llm: Option<LlmClient>) -> Self {
        Self { retriever, llm }
    }

    /// Up to `count` questions answerable from `document`; empty without a working LLM
    pub async fn generate_questions(&self, document: &str, count: usize) -> Vec<String> {
        let Some(llm) = &self.llm else {
            warn!("No LLM configured, cannot generate evaluation questions");
            return Vec::new();
        };

        let excerpt: String = document.chars().take(QUESTION_CONTEXT_CHARS).collect();
        let prompt = format!(
            "Based on the security report below, write {} specific technical questions it answers.\n\
             Return only the questions, one per line.\n\n\
             Report:\n{}",
            count, excerpt
        );

        match llm.complete(&prompt).await {
            Ok(text) => parse_questions(&text, count),
            Err(e) => {
                warn!(error = %e, "Question generation failed");
                Vec::new()
            }
        }
    }

    /// Whether any of the top results for `question` contains `expected_snippet`
    pub async fn evaluate_retrieval(&self, question: &str, expected_snippet: &str) -> Result<bool> {
        let chunks = self
            .retriever
            .retrieve(question, RetrievalStrategy::Standard, EVALUATION_TOP_K)
            .await?;
        Ok(chunks
            .iter()
            .any(|chunk| chunk.chunk_text.contains(expected_snippet)))
    }

    /// Evaluate every case concurrently; failed retrievals count as misses
    pub async fn evaluate(&self, cases: &[EvaluationCase]) -> EvaluationReport {
        let outcomes = join_all(
            cases
                .iter()
                .map(|case| self.evaluate_retrieval(&case.question, &case.expected_snippet)),
        )
        .await;

        let results: Vec<CaseResult> = cases
            .iter()
            .zip(outcomes)
            .map(|(case, outcome)| match outcome {
                Ok(hit) => CaseResult {
                    question: case.question.clone(),
                    hit,
                    error: None,
                },
                Err(e) => CaseResult {
                    question: case.question.clone(),
                    hit: false,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        let hits = results.iter().filter(|r| r.hit).count();
        let total = results.len();
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        info!(total, hits, hit_rate, "Retrieval evaluation complete");

        EvaluationReport {
            total,
            hits,
            hit_rate,
            results,
        }
    }
}

/// One question per non-empty line, list markers stripped
fn parse_questions(text: &str, count: usize) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')', '-', '*'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(count)
        .collect()
}
