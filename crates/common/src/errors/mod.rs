//! Error types for CyberRAG services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for configuration, capability and retrieval failures
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,

    // Resource errors (4xxx)
    NotFound,

    // Rate limiting (6xxx)
    RateLimited,

    // Capability errors (8xxx)
    UpstreamError,
    ModelUnavailable,
    EmbeddingTimeout,
    LlmUnavailable,
    LlmTimeout,
    SourceError,

    // Index & retrieval errors (7xxx)
    IndexError,
    RetrievalFailed,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    DimensionMismatch,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // Index (7xxx)
            ErrorCode::IndexError => 7001,
            ErrorCode::RetrievalFailed => 7002,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::ModelUnavailable => 8002,
            ErrorCode::EmbeddingTimeout => 8003,
            ErrorCode::LlmUnavailable => 8004,
            ErrorCode::LlmTimeout => 8005,
            ErrorCode::SourceError => 8006,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::DimensionMismatch => 9004,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Configuration errors (fatal, never retried)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // Capability errors (recovered by fallbacks)
    #[error("Embedding model unavailable: {message}")]
    ModelUnavailable { message: String },

    #[error("Embedding timeout after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    #[error("LLM unavailable: {message}")]
    LlmUnavailable { message: String },

    #[error("LLM timeout after {timeout_ms}ms")]
    LlmTimeout { timeout_ms: u64 },

    #[error("Report source error: {message}")]
    Source { message: String },

    // Index & retrieval errors
    #[error("Vector index error: {message}")]
    Index { message: String },

    #[error("Retrieval failed: {message}")]
    RetrievalFailed { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        AppError::Configuration {
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::ModelUnavailable { .. } => ErrorCode::ModelUnavailable,
            AppError::EmbeddingTimeout { .. } => ErrorCode::EmbeddingTimeout,
            AppError::LlmUnavailable { .. } => ErrorCode::LlmUnavailable,
            AppError::LlmTimeout { .. } => ErrorCode::LlmTimeout,
            AppError::Source { .. } => ErrorCode::SourceError,
            AppError::Index { .. } => ErrorCode::IndexError,
            AppError::RetrievalFailed { .. } => ErrorCode::RetrievalFailed,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::InvalidFormat { .. } => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Configuration { .. }
            | AppError::DimensionMismatch { .. }
            | AppError::Internal { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::ModelUnavailable { .. }
            | AppError::LlmUnavailable { .. }
            | AppError::Source { .. }
            | AppError::Index { .. }
            | AppError::RetrievalFailed { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 504 Gateway Timeout
            AppError::EmbeddingTimeout { .. } | AppError::LlmTimeout { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }

            // 503 Service Unavailable
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Fatal configuration problems; callers must not retry these
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AppError::Configuration { .. } | AppError::DimensionMismatch { .. }
        )
    }

    /// An external capability (embedding model or LLM) could not serve the call
    pub fn is_capability_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::ModelUnavailable { .. }
                | AppError::EmbeddingTimeout { .. }
                | AppError::LlmUnavailable { .. }
                | AppError::LlmTimeout { .. }
        )
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let details = match &self {
            AppError::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
