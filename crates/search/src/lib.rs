//! CyberRAG search
//!
//! The query side of the pipeline:
//! - [`router`]: decide whether a query needs the knowledge base
//! - [`retrieval`]: standard, hybrid and HyDE retrieval over the vector index
//! - [`answer`]: grounded answer generation with citations
//! - [`pipeline`]: route → retrieve → answer
//! - [`evaluation`]: retrieval hit-rate evaluation

pub mod answer;
pub mod evaluation;
pub mod pipeline;
pub mod retrieval;
pub mod router;

pub use answer::{Answer, AnswerGenerator};
pub use pipeline::{QueryOutcome, QueryPipeline};
pub use retrieval::{RetrievalStrategy, RetrievedChunk, Retriever};
pub use router::{QueryRouter, RouteDecision};
