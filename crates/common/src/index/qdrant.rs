//! Qdrant collection accessed over its REST API

use super::{check_dimension, dedupe_records, VectorIndex};
use crate::config::IndexConfig;
use crate::errors::{AppError, Result};
use crate::models::{RecordPayload, ScoredPayload, VectorRecord};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;
use uuid::Uuid;

pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
    dimension: usize,
    ready: OnceCell<()>,
}

#[derive(Serialize)]
struct Point<'a> {
    id: Uuid,
    vector: &'a [f32],
    payload: &'a RecordPayload,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct SearchHit {
    id: Uuid,
    score: f32,
    payload: Option<RecordPayload>,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Deserialize)]
struct VectorParams {
    size: usize,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig, dimension: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key: config.api_key.clone(),
            dimension,
            ready: OnceCell::new(),
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(|e| AppError::Index {
            message: format!("Qdrant request failed: {}", e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Index {
                message: format!("Qdrant error {}: {}", status, body),
            });
        }
        Ok(response)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let parsed: QdrantResponse<T> = response.json().await.map_err(|e| AppError::Index {
            message: format!("Failed to parse Qdrant response: {}", e),
        })?;
        Ok(parsed.result)
    }

    /// Create the collection on first use, or verify its vector size
    async fn ensure_collection(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| self.init_collection())
            .await
            .map(|_| ())
    }

    async fn init_collection(&self) -> Result<()> {
        let url = self.collection_url("");
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| AppError::Index {
                message: format!("Qdrant request failed: {}", e),
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = json!({
                "vectors": { "size": self.dimension, "distance": "Cosine" }
            });
            self.send(self.request(Method::PUT, &url).json(&body)).await?;
            tracing::info!(
                collection = %self.collection,
                dimension = self.dimension,
                "Created Qdrant collection"
            );
            return Ok(());
        }

        if !response.status().is_success() {
            return Err(AppError::Index {
                message: format!("Qdrant error {}", response.status()),
            });
        }

        let info: CollectionInfo = Self::parse(response).await?;
        if info.config.params.vectors.size != self.dimension {
            return Err(AppError::configuration(format!(
                "Collection '{}' stores {}-dimensional vectors but the embedding model produces {}",
                self.collection, info.config.params.vectors.size, self.dimension
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        for record in &records {
            check_dimension(self.dimension, &record.vector)?;
        }
        let records = dedupe_records(records);
        if records.is_empty() {
            return Ok(0);
        }
        self.ensure_collection().await?;

        // All points in one request: the call writes everything or nothing
        let url = self.collection_url("/points?wait=true");
        self.send(self.request(Method::PUT, &url).json(&points_body(&records)))
            .await?;

        tracing::debug!(written = records.len(), collection = %self.collection, "Upserted points");
        Ok(records.len())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPayload>> {
        check_dimension(self.dimension, query)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        self.ensure_collection().await?;

        let body = json!({ "vector": query, "limit": k, "with_payload": true });
        let response = self
            .send(
                self.request(Method::POST, &self.collection_url("/points/search"))
                    .json(&body),
            )
            .await?;
        let hits: Vec<SearchHit> = Self::parse(response).await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                hit.payload.map(|payload| ScoredPayload {
                    record_id: hit.id,
                    payload,
                    score: hit.score,
                })
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        self.ensure_collection().await?;
        let response = self
            .send(
                self.request(Method::POST, &self.collection_url("/points/count"))
                    .json(&json!({ "exact": true })),
            )
            .await?;
        let result: CountResult = Self::parse(response).await?;
        Ok(result.count)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

fn points_body(records: &[VectorRecord]) -> serde_json::Value {
    let points: Vec<Point<'_>> = records
        .iter()
        .map(|r| Point {
            id: r.record_id,
            vector: &r.vector,
            payload: &r.payload,
        })
        .collect();
    json!({ "points": points })
}
