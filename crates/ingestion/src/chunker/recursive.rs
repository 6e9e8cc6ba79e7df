//! Recursive character splitting with exact overlap
//!
//! Sizes are measured in characters, not bytes.

use cyberrag_common::errors::{AppError, Result};
use std::ops::Range;
use tracing::debug;

/// Separators tried in order; the empty separator hard-splits by characters
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ".", " ", ""];

/// Splits text into chunks of at most `chunk_size` characters where each chunk
/// after the first repeats the last `chunk_overlap` characters of its
/// predecessor.
#[derive(Debug, Clone, Copy)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// Fails with a configuration error unless `0 <= chunk_overlap < chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(AppError::configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the text
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;

        if total <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut pieces = Vec::new();
        self.decompose(text, 0, 0, &mut pieces);

        let to_char = |byte: usize| bounds.binary_search(&byte).unwrap_or_else(|i| i);
        let ends: Vec<usize> = pieces.iter().map(|p| to_char(p.end)).collect();

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let limit = start + self.chunk_size;
            let idx = ends.partition_point(|&e| e <= limit);
            let end = match idx.checked_sub(1).map(|i| ends[i]) {
                Some(e) if e > start + self.chunk_overlap => e,
                _ => limit.min(total),
            };

            chunks.push(text[bounds[start]..bounds[end]].to_string());
            if end >= total {
                break;
            }
            start = end - self.chunk_overlap;
        }

        debug!(
            input_chars = total,
            pieces = pieces.len(),
            chunk_count = chunks.len(),
            chunk_size = self.chunk_size,
            "Text chunked"
        );

        chunks
    }

    fn max_piece(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Break `text` into contiguous byte ranges no longer than `max_piece`
    /// characters, keeping each separator at the end of the piece before it.
    fn decompose(&self, text: &str, offset: usize, level: usize, out: &mut Vec<Range<usize>>) {
        if text.chars().count() <= self.max_piece() {
            out.push(offset..offset + text.len());
            return;
        }

        let separator = SEPARATORS[level.min(SEPARATORS.len() - 1)];
        if separator.is_empty() {
            let mut start = 0;
            for (count, (i, _)) in text.char_indices().enumerate() {
                if count > 0 && count % self.max_piece() == 0 {
                    out.push(offset + start..offset + i);
                    start = i;
                }
            }
            out.push(offset + start..offset + text.len());
            return;
        }

        let mut start = 0;
        for (i, _) in text.match_indices(separator) {
            let end = i + separator.len();
            self.decompose(&text[start..end], offset + start, level + 1, out);
            start = end;
        }
        if start < text.len() {
            self.decompose(&text[start..], offset + start, level + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = chunks[0].clone();
        for chunk in &chunks[1..] {
            out.extend(chunk.chars().skip(overlap));
        }
        out
    }

    fn tail(s: &str, n: usize) -> String {
        let count = s.chars().count();
        s.chars().skip(count - n).collect()
    }

    fn head(s: &str, n: usize) -> String {
        s.chars().take(n).collect()
    }

    #[test]
    fn test_overlap_not_smaller_than_size_rejected() {
        let err = RecursiveSplitter::new(10, 10).unwrap_err();
        assert!(err.is_configuration());
        assert!(RecursiveSplitter::new(10, 25).is_err());
        assert!(RecursiveSplitter::new(0, 0).is_err());
        assert!(RecursiveSplitter::new(10, 9).is_ok());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = RecursiveSplitter::new(1000, 200).unwrap();
        let text = "Stored XSS in the comments section.";
        assert_eq!(splitter.split(text), vec![text.to_string()]);
    }

    #[test]
    fn test_exact_chunk_size_is_single_chunk() {
        let splitter = RecursiveSplitter::new(10, 2).unwrap();
        assert_eq!(splitter.split("abcdefghij"), vec!["abcdefghij".to_string()]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        let splitter = RecursiveSplitter::new(100, 10).unwrap();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("  \n\n\t ").is_empty());
    }

    #[test]
    fn test_overlap_and_reconstruction() {
        let splitter = RecursiveSplitter::new(200, 50).unwrap();
        let text = "The attacker injects a payload into the profile field. \
                    The payload is rendered without escaping.\n\n"
            .repeat(12);

        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200);
        }
        for pair in chunks.windows(2) {
            assert_eq!(tail(&pair[0], 50), head(&pair[1], 50));
        }
        assert_eq!(reconstruct(&chunks, 50), text);
    }

    #[test]
    fn test_hard_split_without_separators() {
        let splitter = RecursiveSplitter::new(10, 3).unwrap();
        let text = "x".repeat(45);
        let chunks = splitter.split(&text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
        assert_eq!(reconstruct(&chunks, 3), text);
    }

    #[test]
    fn test_multibyte_text() {
        let splitter = RecursiveSplitter::new(30, 5).unwrap();
        let text = "Injeção de SQL crítica é possível. ".repeat(6);
        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30);
        }
        for pair in chunks.windows(2) {
            assert_eq!(tail(&pair[0], 5), head(&pair[1], 5));
        }
        assert_eq!(reconstruct(&chunks, 5), text);
    }

    #[test]
    fn test_zero_overlap() {
        let splitter = RecursiveSplitter::new(20, 0).unwrap();
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = splitter.split(text);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let splitter = RecursiveSplitter::new(60, 10).unwrap();
        let para = "Short paragraph about SSRF in webhooks.\n\n";
        let text = para.repeat(3);
        let chunks = splitter.split(&text);
        assert!(chunks[0].ends_with("\n\n"));
    }
}
