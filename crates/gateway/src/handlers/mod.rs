//! API handlers module

pub mod health;
pub mod ingest;
pub mod query;

use cyberrag_common::errors::{AppError, Result};
use validator::Validate;

/// Run the request's `validator` rules
pub(crate) fn validate<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}
