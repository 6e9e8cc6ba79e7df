//! Chunks and vector records

use super::ReportMetadata;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A bounded slice of a report's text, the unit of indexing and retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_report_id: String,
    /// Position of this chunk within its report, starting at 0
    pub ordinal: usize,
    pub metadata: ReportMetadata,
}

impl Chunk {
    /// Deterministic record id for this chunk
    pub fn record_id(&self) -> Uuid {
        record_id(&self.source_report_id, self.ordinal)
    }
}

/// Payload stored alongside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPayload {
    pub chunk_text: String,
    #[serde(default)]
    pub ordinal: usize,
    pub metadata: ReportMetadata,
}

/// A vector plus payload, keyed by a stable id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub record_id: Uuid,
    pub vector: Vec<f32>,
    pub payload: RecordPayload,
}

impl VectorRecord {
    /// Build the record for an embedded chunk
    pub fn from_chunk(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            record_id: chunk.record_id(),
            vector,
            payload: RecordPayload {
                chunk_text: chunk.text,
                ordinal: chunk.ordinal,
                metadata: chunk.metadata,
            },
        }
    }
}

/// A search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPayload {
    pub record_id: Uuid,
    pub payload: RecordPayload,
    /// Cosine similarity to the query vector
    pub score: f32,
}

/// Derive a record id from the report id and chunk ordinal.
///
/// Re-ingesting a report maps every chunk onto the record it produced before,
/// so upserts replace instead of duplicating.
pub fn record_id(report_id: &str, ordinal: usize) -> Uuid {
    let digest = Sha256::digest(format!("{}:{}", report_id, ordinal).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_is_deterministic() {
        assert_eq!(record_id("H1-100000", 0), record_id("H1-100000", 0));
        assert_ne!(record_id("H1-100000", 0), record_id("H1-100000", 1));
        assert_ne!(record_id("H1-100000", 0), record_id("H1-100001", 0));
    }

    #[test]
    fn test_record_id_does_not_collide_on_concatenation() {
        // "1:23" vs "12:3"
        assert_ne!(record_id("1", 23), record_id("12", 3));
    }
}
