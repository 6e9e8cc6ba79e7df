//! Ingestion service error types

use cyberrag_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Report source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IngestionError {
    /// Transient failures the caller may retry; configuration problems are fatal
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestionError::Embedding(_)
                | IngestionError::Index(_)
                | IngestionError::Source(_)
                | IngestionError::Io(_)
        )
    }
}

impl From<AppError> for IngestionError {
    fn from(e: AppError) -> Self {
        if e.is_configuration() {
            return IngestionError::Configuration(e.to_string());
        }
        match e {
            AppError::ModelUnavailable { .. } | AppError::EmbeddingTimeout { .. } => {
                IngestionError::Embedding(e.to_string())
            }
            AppError::Source { .. } => IngestionError::Source(e.to_string()),
            AppError::Serialization(inner) => IngestionError::Serialization(inner),
            other => IngestionError::Index(other.to_string()),
        }
    }
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::Configuration(message) => AppError::Configuration { message },
            IngestionError::Embedding(message) => AppError::ModelUnavailable { message },
            IngestionError::Index(message) => AppError::Index { message },
            IngestionError::Source(message) => AppError::Source { message },
            IngestionError::Io(err) => AppError::Internal {
                message: err.to_string(),
            },
            IngestionError::Serialization(err) => AppError::Serialization(err),
        }
    }
}
