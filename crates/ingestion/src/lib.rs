//! CyberRAG ingestion
//!
//! Turns vulnerability reports into indexed chunks:
//! - [`source`]: where reports come from (HackerOne API, mock data, JSON files)
//! - [`chunker`]: how report text is split
//! - [`coordinator`]: chunk, embed and upsert a batch of reports

pub mod chunker;
pub mod coordinator;
pub mod errors;
pub mod source;

pub use chunker::{ChunkingEngine, ChunkingStrategy};
pub use coordinator::{IngestionCoordinator, IngestionSummary};
pub use errors::IngestionError;
pub use source::ReportSource;
