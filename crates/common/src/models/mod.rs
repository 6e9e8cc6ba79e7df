//! Domain models
//!
//! Vulnerability reports and the records derived from them during ingestion.

mod chunk;
mod report;

pub use chunk::{record_id, Chunk, RecordPayload, ScoredPayload, VectorRecord};
pub use report::{Report, ReportMetadata};
