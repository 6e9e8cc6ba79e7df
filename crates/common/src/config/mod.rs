//! Configuration management for CyberRAG services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Chunking policy
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval defaults
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Report source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: http, hashing
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL of an OpenAI-compatible embeddings endpoint
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// LLM provider: openai, gemini, ollama, disabled
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key (openai and gemini providers)
    pub api_key: Option<String>,

    /// Base URL of the provider
    pub base_url: Option<String>,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Index backend: memory, qdrant
    #[serde(default = "default_index_backend")]
    pub backend: String,

    /// Qdrant REST endpoint
    #[serde(default = "default_index_url")]
    pub url: String,

    /// Qdrant API key
    pub api_key: Option<String>,

    /// Collection name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Request timeout in seconds
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Strategy: recursive, whole_document, semantic, agentic
    #[serde(default = "default_chunk_strategy")]
    pub strategy: String,

    /// Maximum chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Reports up to this many characters may be indexed whole
    pub whole_document_threshold: Option<usize>,

    /// Percentile of adjacent-sentence distances used as semantic breakpoint
    #[serde(default = "default_breakpoint_percentile")]
    pub breakpoint_percentile: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Default number of results
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Maximum number of results a caller may request
    #[serde(default = "default_max_k")]
    pub max_k: usize,

    /// Vector search timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Collection method: api, mock, file
    #[serde(default = "default_source_method")]
    pub method: String,

    /// HackerOne API identifier
    pub api_identifier: Option<String>,

    /// HackerOne API token
    pub api_token: Option<String>,

    /// HackerOne API base URL
    #[serde(default = "default_source_base_url")]
    pub base_url: String,

    /// Reports to fetch per run
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,

    /// JSON file of reports (file method)
    pub file_path: Option<String>,

    /// Interval between scheduled ingestions in seconds (0 runs once)
    #[serde(default = "default_schedule_interval")]
    pub schedule_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_embedding_provider() -> String { "hashing".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_batch_size() -> usize { 32 }
fn default_llm_provider() -> String { "disabled".to_string() }
fn default_llm_model() -> String { "llama3".to_string() }
fn default_llm_timeout() -> u64 { 60 }
fn default_temperature() -> f32 { 0.2 }
fn default_max_tokens() -> usize { 1024 }
fn default_index_backend() -> String { "memory".to_string() }
fn default_index_url() -> String { "http://localhost:6333".to_string() }
fn default_collection() -> String { crate::DEFAULT_COLLECTION.to_string() }
fn default_index_timeout() -> u64 { 10 }
fn default_chunk_strategy() -> String { "recursive".to_string() }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 200 }
fn default_breakpoint_percentile() -> f32 { 95.0 }
fn default_k() -> usize { 5 }
fn default_max_k() -> usize { 50 }
fn default_search_timeout() -> u64 { 10 }
fn default_source_method() -> String { "mock".to_string() }
fn default_source_base_url() -> String { "https://api.hackerone.com/v1".to_string() }
fn default_fetch_limit() -> usize { 3 }
fn default_schedule_interval() -> u64 { 6 * 60 * 60 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "cyberrag".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

const EMBEDDING_PROVIDERS: &[&str] = &["http", "hashing"];
const LLM_PROVIDERS: &[&str] = &["openai", "gemini", "ollama", "disabled"];
const INDEX_BACKENDS: &[&str] = &["memory", "qdrant"];
const SOURCE_METHODS: &[&str] = &["api", "mock", "file"];

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__EMBEDDING__PROVIDER=http
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings that can never work
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.embedding.dimension == 0 {
            return Err(AppError::configuration("embedding.dimension must be positive"));
        }
        if self.embedding.batch_size == 0 {
            return Err(AppError::configuration("embedding.batch_size must be positive"));
        }
        if self.retrieval.max_k == 0 {
            return Err(AppError::configuration("retrieval.max_k must be positive"));
        }

        check_choice("embedding.provider", &self.embedding.provider, EMBEDDING_PROVIDERS)?;
        check_choice("llm.provider", &self.llm.provider, LLM_PROVIDERS)?;
        check_choice("index.backend", &self.index.backend, INDEX_BACKENDS)?;
        check_choice("source.method", &self.source.method, SOURCE_METHODS)?;

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn check_choice(key: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::configuration(format!(
            "{} must be one of {:?}, got '{}'",
            key, allowed, value
        )))
    }
}

impl ChunkingConfig {
    /// Chunk size must be positive and strictly larger than the overlap
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(AppError::configuration("chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if !(0.0..=100.0).contains(&self.breakpoint_percentile) {
            return Err(AppError::configuration(
                "breakpoint_percentile must be within 0..=100",
            ));
        }
        Ok(())
    }

    /// Effective whole-document threshold (defaults to chunk_size)
    pub fn whole_document_threshold(&self) -> usize {
        self.whole_document_threshold.unwrap_or(self.chunk_size)
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RetrievalConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            base_url: None,
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            url: default_index_url(),
            api_key: None,
            collection: default_collection(),
            timeout_secs: default_index_timeout(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: default_chunk_strategy(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            whole_document_threshold: None,
            breakpoint_percentile: default_breakpoint_percentile(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            max_k: default_max_k(),
            search_timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            method: default_source_method(),
            api_identifier: None,
            api_token: None,
            base_url: default_source_base_url(),
            fetch_limit: default_fetch_limit(),
            file_path: None,
            schedule_interval_secs: default_schedule_interval(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            index: IndexConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            source: SourceConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
