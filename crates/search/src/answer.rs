//! Answer generation
//!
//! Turns the retrieved chunks into a numbered context, asks the LLM for an
//! analyst-style answer, and extracts the `[n]` citations it used. Without an
//! LLM the answer lists the retrieved excerpts instead.

use crate::retrieval::RetrievedChunk;
use cyberrag_common::errors::Result;
use cyberrag_common::llm::LlmClient;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::{info, instrument};

/// A report used as context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub link: String,
    pub severity: String,
}

/// Citation in a generated answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Citation index (1-based)
    pub index: usize,
    pub report_id: String,
    pub title: String,
    pub link: String,
}

/// Generated answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,

    /// Context entries in prompt order
    pub sources: Vec<Source>,

    /// Context entries the answer refers to
    pub citations: Vec<Citation>,

    /// False when the answer was produced without any retrieved context
    pub grounded: bool,
}

#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Option<LlmClient>,
}

impl AnswerGenerator {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    /// Answer `query` from `context`.
    ///
    /// An empty context still produces an answer, flagged as ungrounded.
    #[instrument(skip(self, context), fields(context = context.len()))]
    pub async fn generate(&self, query: &str, context: &[RetrievedChunk]) -> Result<Answer> {
        let sources = sources(context);
        let grounded = !context.is_empty();

        let text = match &self.llm {
            Some(llm) => llm.complete(&build_prompt(query, context)).await?,
            None => extractive_answer(context),
        };

        let citations = extract_citations(&text, context);
        info!(grounded, citations = citations.len(), "Answer generated");

        Ok(Answer {
            text,
            sources,
            citations,
            grounded,
        })
    }
}

fn sources(context: &[RetrievedChunk]) -> Vec<Source> {
    context
        .iter()
        .map(|chunk| Source {
            title: chunk.metadata.title.clone(),
            link: chunk.metadata.link.clone(),
            severity: chunk.metadata.severity.clone(),
        })
        .collect()
}

/// Render the retrieved chunks as `[n] title (severity)` blocks
pub fn format_context(context: &[RetrievedChunk]) -> String {
    let mut out = String::new();
    for (i, chunk) in context.iter().enumerate() {
        out.push_str(&format!(
            "[{}] {} (severity: {}, link: {})\n{}\n\n",
            i + 1,
            chunk.metadata.title,
            chunk.metadata.severity,
            chunk.metadata.link,
            chunk.chunk_text.trim()
        ));
    }
    out
}

fn build_prompt(query: &str, context: &[RetrievedChunk]) -> String {
    let context_block = if context.is_empty() {
        "(no relevant reports were found)".to_string()
    } else {
        format_context(context)
    };

    format!(
        "You are a senior application security analyst. Answer the question using ONLY the \
         vulnerability reports below.\n\n\
         Instructions:\n\
         - Summarize the attack techniques involved.\n\
         - Give concrete defensive recommendations.\n\
         - Cite the reports you use inline as [1], [2], etc.\n\
         - If the reports are empty or do not cover the question, say so explicitly before answering from general knowledge.\n\
         - Reply in the language of the question.\n\n\
         Question: {}\n\n\
         Reports:\n{}\n\
         Answer:",
        query, context_block
    )
}

fn extractive_answer(context: &[RetrievedChunk]) -> String {
    if context.is_empty() {
        return "No language model is configured and no relevant reports were found.".to_string();
    }

    let mut out = String::from("No language model is configured. Most relevant reports:\n\n");
    out.push_str(&format_context(context));
    out.trim_end().to_string()
}

fn citation_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(\d+)\]").ok()).as_ref()
}

/// Citations `[n]` in `text` that refer to an entry of `context`, in index order
pub fn extract_citations(text: &str, context: &[RetrievedChunk]) -> Vec<Citation> {
    let Some(pattern) = citation_pattern() else {
        return Vec::new();
    };

    let indices: BTreeSet<usize> = pattern
        .captures_iter(text)
        .filter_map(|cap| cap.get(1)?.as_str().parse().ok())
        .filter(|&n| n >= 1 && n <= context.len())
        .collect();

    indices
        .into_iter()
        .map(|index| {
            let metadata = &context[index - 1].metadata;
            Citation {
                index,
                report_id: metadata.report_id.clone(),
                title: metadata.title.clone(),
                link: metadata.link.clone(),
            }
        })
        .collect()
}
