//! Process-local index

use super::{check_dimension, cosine_similarity, dedupe_records, VectorIndex};
use crate::errors::Result;
use crate::models::{ScoredPayload, VectorRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Store {
    records: Vec<VectorRecord>,
    positions: HashMap<Uuid, usize>,
}

/// Exact brute-force cosine search over records held in memory.
///
/// Readers run concurrently; an upsert batch becomes visible all at once.
pub struct InMemoryIndex {
    dimension: usize,
    store: RwLock<Store>,
}

impl InMemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            store: RwLock::new(Store::default()),
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        for record in &records {
            check_dimension(self.dimension, &record.vector)?;
        }

        let records = dedupe_records(records);
        let written = records.len();
        let mut store = self.store.write().await;
        for record in records {
            match store.positions.get(&record.record_id).copied() {
                Some(pos) => store.records[pos] = record,
                None => {
                    let pos = store.records.len();
                    store.positions.insert(record.record_id, pos);
                    store.records.push(record);
                }
            }
        }

        tracing::debug!(written, total = store.records.len(), "Upserted records");
        Ok(written)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPayload>> {
        check_dimension(self.dimension, query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let store = self.store.read().await;
        let mut hits: Vec<ScoredPayload> = store
            .records
            .iter()
            .map(|r| ScoredPayload {
                record_id: r.record_id,
                payload: r.payload.clone(),
                score: cosine_similarity(query, &r.vector),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.store.read().await.records.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "memory"
    }
}
