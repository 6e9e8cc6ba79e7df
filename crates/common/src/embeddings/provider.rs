//! Embedding provider
//!
//! Wraps an [`Embedder`] backend with the guarantees the rest of the system
//! relies on: unit-length vectors, one vector per input in input order, the
//! configured dimension, and a bounded wait. Failures are not retried here.

use super::{create_embedder, Embedder};
use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Explicitly constructed handle to the embedding model
#[derive(Clone)]
pub struct EmbeddingProvider {
    inner: Arc<dyn Embedder>,
    timeout: Duration,
}

impl EmbeddingProvider {
    pub fn new(inner: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Build the configured backend
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self::new(create_embedder(config)?, config.timeout()))
    }

    pub fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    /// Embed a batch; position i of the output belongs to position i of the input
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.inner.embed_batch(texts)).await;

        let outcome = match result {
            Err(_) => Err(AppError::EmbeddingTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
            Ok(Err(e)) => Err(into_unavailable(e)),
            Ok(Ok(vectors)) => self.finish(texts.len(), vectors),
        };

        metrics::record_embedding(
            start.elapsed().as_secs_f64(),
            self.model_name(),
            texts.len(),
            outcome.is_ok(),
        );

        if let Err(e) = &outcome {
            tracing::warn!(
                model = %self.model_name(),
                batch_size = texts.len(),
                error = %e,
                "Embedding request failed"
            );
        }

        outcome
    }

    /// Embed a single text
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors.pop().ok_or_else(|| AppError::ModelUnavailable {
            message: "Empty response".to_string(),
        })
    }

    fn finish(&self, expected: usize, mut vectors: Vec<Vec<f32>>) -> Result<Vec<Vec<f32>>> {
        if vectors.len() != expected {
            return Err(AppError::ModelUnavailable {
                message: format!(
                    "Model returned {} vectors for {} inputs",
                    vectors.len(),
                    expected
                ),
            });
        }

        let dimension = self.dimension();
        for vector in vectors.iter_mut() {
            if vector.len() != dimension {
                return Err(AppError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            l2_normalize(vector);
        }

        Ok(vectors)
    }
}

/// Backend errors other than configuration problems mean the model is unavailable
fn into_unavailable(err: AppError) -> AppError {
    match err {
        e @ (AppError::ModelUnavailable { .. }
        | AppError::EmbeddingTimeout { .. }
        | AppError::Configuration { .. }
        | AppError::DimensionMismatch { .. }) => e,
        other => AppError::ModelUnavailable {
            message: other.to_string(),
        },
    }
}

/// Scale a vector to unit length in place; zero vectors are left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
