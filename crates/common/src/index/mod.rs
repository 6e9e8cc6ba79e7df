//! Vector index
//!
//! Stores [`VectorRecord`]s keyed by record id and answers top-k cosine
//! similarity queries. Upserting an existing id replaces the record.

mod memory;
mod qdrant;

pub use memory::InMemoryIndex;
pub use qdrant::QdrantIndex;

use crate::config::IndexConfig;
use crate::errors::{AppError, Result};
use crate::models::{ScoredPayload, VectorRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records by id; returns the number of distinct ids written.
    ///
    /// A record whose vector has the wrong dimension rejects the whole batch.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize>;

    /// Up to `k` records ordered by descending similarity
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPayload>>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;

    /// Dimension every stored vector must have
    fn dimension(&self) -> usize;

    /// Backend name for logs and health output
    fn name(&self) -> &str;
}

/// Reject vectors that do not match the index dimension
pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(AppError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Collapse records sharing an id. The last one wins and takes the slot of the first.
pub fn dedupe_records(records: Vec<VectorRecord>) -> Vec<VectorRecord> {
    let mut positions: HashMap<Uuid, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<VectorRecord> = Vec::with_capacity(records.len());
    for record in records {
        match positions.get(&record.record_id).copied() {
            Some(pos) => unique[pos] = record,
            None => {
                positions.insert(record.record_id, unique.len());
                unique.push(record);
            }
        }
    }
    unique
}

/// Cosine similarity; 0.0 when either vector has zero length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Create the configured index backend
pub fn create_index(config: &IndexConfig, dimension: usize) -> Result<Arc<dyn VectorIndex>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryIndex::new(dimension))),
        "qdrant" => Ok(Arc::new(QdrantIndex::new(config, dimension)?)),
        other => Err(AppError::configuration(format!(
            "Unknown index backend '{}'",
            other
        ))),
    }
}
