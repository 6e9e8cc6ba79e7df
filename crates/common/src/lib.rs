//! CyberRAG Common Library
//!
//! Shared code for all CyberRAG crates including:
//! - Report, chunk and vector-record models
//! - Embedding provider abstraction
//! - LLM text-completion clients
//! - Vector index (in-memory and Qdrant)
//! - Error types and handling
//! - Configuration management
//! - Logging and metrics

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod index;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod telemetry;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::{Embedder, EmbeddingProvider};
pub use errors::{AppError, Result};
pub use index::VectorIndex;
pub use llm::{LanguageModel, LlmClient};
pub use models::{Chunk, Report, ReportMetadata, VectorRecord};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Default embedding dimension (matches all-MiniLM-L6-v2)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Default vector collection name
pub const DEFAULT_COLLECTION: &str = "hackerone_reports";
