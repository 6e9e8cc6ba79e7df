//! Breakpoint chunking on embedding distance between adjacent sentences

use super::{pack_groups, split_sentences, RecursiveSplitter};
use cyberrag_common::embeddings::EmbeddingProvider;
use cyberrag_common::errors::Result;
use cyberrag_common::index::cosine_similarity;

pub(super) async fn split(
    text: &str,
    embeddings: &EmbeddingProvider,
    breakpoint_percentile: f32,
    splitter: &RecursiveSplitter,
) -> Result<Vec<String>> {
    let sentences = split_sentences(text);
    if sentences.len() < 2 {
        return Ok(splitter.split(text));
    }

    let inputs: Vec<String> = sentences.iter().map(|s| s.to_string()).collect();
    let vectors = embeddings.embed_batch(&inputs).await?;

    let distances: Vec<f32> = vectors
        .windows(2)
        .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]))
        .collect();
    let threshold = percentile(&distances, breakpoint_percentile);

    let mut groups = Vec::new();
    let mut current = String::new();
    for (i, sentence) in sentences.iter().enumerate() {
        current.push_str(sentence);
        if distances.get(i).is_some_and(|d| *d > threshold) {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    tracing::debug!(
        sentences = sentences.len(),
        groups = groups.len(),
        threshold,
        "Semantic breakpoints computed"
    );

    Ok(pack_groups(groups, splitter))
}

/// Linear-interpolated percentile; `p` in `0..=100`
fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f32)
}
