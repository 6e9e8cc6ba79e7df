//! LLM-chosen section boundaries

use super::{pack_groups, split_sentences, RecursiveSplitter};
use cyberrag_common::errors::{AppError, Result};
use cyberrag_common::llm::LlmClient;

pub(super) async fn split(
    text: &str,
    llm: &LlmClient,
    splitter: &RecursiveSplitter,
) -> Result<Vec<String>> {
    let sentences = split_sentences(text);
    if sentences.len() < 2 {
        return Ok(splitter.split(text));
    }

    let answer = llm.complete(&build_prompt(&sentences)).await?;
    let breaks = parse_breaks(&answer, sentences.len()).ok_or_else(|| AppError::LlmUnavailable {
        message: format!("Unparseable section boundaries: {:?}", answer.trim()),
    })?;

    let mut groups = Vec::with_capacity(breaks.len() + 1);
    let mut start = 0;
    for &b in breaks.iter().chain(std::iter::once(&sentences.len())) {
        groups.push(sentences[start..b].concat());
        start = b;
    }

    tracing::debug!(sections = groups.len(), "Agentic boundaries applied");
    Ok(pack_groups(groups, splitter))
}

fn build_prompt(sentences: &[&str]) -> String {
    let mut prompt = String::from(
        "You are segmenting a security vulnerability report into coherent sections \
         (summary, reproduction steps, impact, remediation, and so on).\n\
         Below are the report's sentences, numbered from 0.\n\
         Reply with the numbers of the sentences that START a new section, \
         as a comma-separated list. Do not include 0. Reply with numbers only.\n\n",
    );
    for (i, sentence) in sentences.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i, sentence.trim()));
    }
    prompt
}

/// Sorted, deduplicated interior boundaries; `None` when the answer holds no integers
fn parse_breaks(answer: &str, sentence_count: usize) -> Option<Vec<usize>> {
    let numbers: Vec<usize> = answer
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|s| s.parse().ok())
        .collect();
    if numbers.is_empty() {
        return None;
    }

    let mut breaks: Vec<usize> = numbers
        .into_iter()
        .filter(|&n| n > 0 && n < sentence_count)
        .collect();
    breaks.sort_unstable();
    breaks.dedup();
    Some(breaks)
}
