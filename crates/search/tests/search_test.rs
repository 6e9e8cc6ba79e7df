//! Routing, retrieval and the query pipeline over an in-memory knowledge base

use async_trait::async_trait;
use cyberrag_common::config::ChunkingConfig;
use cyberrag_common::embeddings::{Embedder, EmbeddingProvider, HashingEmbedder};
use cyberrag_common::errors::{AppError, Result};
use cyberrag_common::index::{InMemoryIndex, VectorIndex};
use cyberrag_common::llm::{LlmClient, MockLlm};
use cyberrag_common::models::{ScoredPayload, VectorRecord};
use cyberrag_ingestion::source::MockReportSource;
use cyberrag_ingestion::{ChunkingEngine, ChunkingStrategy, IngestionCoordinator};
use cyberrag_search::evaluation::{EvaluationCase, RetrievalEvaluator};
use cyberrag_search::{
    AnswerGenerator, QueryPipeline, QueryRouter, RetrievalStrategy, Retriever, RouteDecision,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DIMENSION: usize = 384;
const XSS_QUERY: &str = "Quais técnicas de XSS recentes foram encontradas?";

/// Hashing embedder that counts the texts it embeds
struct CountingEmbedder {
    inner: HashingEmbedder,
    texts: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            inner: HashingEmbedder::new(DIMENSION),
            texts: AtomicUsize::new(0),
        }
    }

    fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }

    fn model_name(&self) -> &str {
        "counting"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

/// Index whose searches always fail
struct BrokenIndex;

#[async_trait]
impl VectorIndex for BrokenIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        Ok(records.len())
    }

    async fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<ScoredPayload>> {
        Err(AppError::Index {
            message: "collection unreachable".to_string(),
        })
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Index whose searches never finish
struct StalledIndex;

#[async_trait]
impl VectorIndex for StalledIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        Ok(records.len())
    }

    async fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<ScoredPayload>> {
        std::future::pending().await
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

fn llm(mock: &Arc<MockLlm>) -> Option<LlmClient> {
    Some(LlmClient::new(mock.clone(), Duration::from_secs(5)))
}

/// Knowledge base holding the three mock reports
async fn knowledge_base(embedder: Arc<dyn Embedder>) -> (EmbeddingProvider, Arc<InMemoryIndex>) {
    let embeddings = EmbeddingProvider::new(embedder, Duration::from_secs(5));
    let index = Arc::new(InMemoryIndex::new(DIMENSION));
    let coordinator = IngestionCoordinator::new(
        ChunkingEngine::new(&ChunkingConfig::default()).unwrap(),
        embeddings.clone(),
        index.clone(),
        ChunkingStrategy::Recursive,
    )
    .unwrap();

    let summary = coordinator
        .ingest(&MockReportSource::reports(3))
        .await
        .unwrap();
    assert_eq!(summary.chunks_indexed, 3);

    (embeddings, index)
}

fn pipeline(
    embeddings: EmbeddingProvider,
    index: Arc<dyn VectorIndex>,
    llm: Option<LlmClient>,
) -> QueryPipeline {
    QueryPipeline::new(
        QueryRouter::new(llm.clone()),
        Retriever::new(embeddings, index, llm.clone(), Duration::from_secs(5)),
        AnswerGenerator::new(llm),
        5,
    )
}

#[tokio::test]
async fn test_xss_query_routes_to_knowledge_base_and_retrieves() {
    let (embeddings, index) = knowledge_base(Arc::new(HashingEmbedder::new(DIMENSION))).await;
    let mock = Arc::new(MockLlm::replying("web_search"));

    let router = QueryRouter::new(llm(&mock));
    assert_eq!(router.route(XSS_QUERY).await, RouteDecision::KnowledgeBase);
    assert_eq!(mock.calls(), 0);

    let retriever = Retriever::new(embeddings, index, None, Duration::from_secs(5));
    let chunks = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Standard, 5)
        .await
        .unwrap();
    assert!(!chunks.is_empty());
    assert!(chunks.len() <= 3);
    for pair in chunks.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(chunks[0].metadata.report_id.starts_with("H1-"));
}

#[tokio::test]
async fn test_greeting_answers_directly_without_retrieval() {
    let embedder = Arc::new(CountingEmbedder::new());
    let (embeddings, index) = knowledge_base(embedder.clone()).await;
    let embedded_during_ingestion = embedder.texts();

    let mock = Arc::new(MockLlm::scripted(vec![
        Ok("direct_answer".to_string()),
        Ok("Tudo bem! Como posso ajudar?".to_string()),
    ]));
    let outcome = pipeline(embeddings, index, llm(&mock))
        .run("Olá, como vai?")
        .await
        .unwrap();

    assert_eq!(outcome.route, RouteDecision::DirectAnswer);
    assert_eq!(outcome.strategy, None);
    assert!(outcome.context.is_empty());
    assert!(!outcome.answer.grounded);
    assert_eq!(outcome.answer.text, "Tudo bem! Como posso ajudar?");
    assert_eq!(embedder.texts(), embedded_during_ingestion);
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn test_hyde_with_failing_llm_matches_standard() {
    let (embeddings, index) = knowledge_base(Arc::new(HashingEmbedder::new(DIMENSION))).await;
    let retriever = Retriever::new(
        embeddings,
        index,
        llm(&Arc::new(MockLlm::failing())),
        Duration::from_secs(5),
    );

    let hyde = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Hyde, 5)
        .await
        .unwrap();
    let standard = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Standard, 5)
        .await
        .unwrap();
    assert_eq!(hyde, standard);

    let hybrid = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Hybrid, 5)
        .await
        .unwrap();
    assert_eq!(hybrid, standard);
}

#[tokio::test]
async fn test_hyde_searches_with_hypothetical_document() {
    let (embeddings, index) = knowledge_base(Arc::new(HashingEmbedder::new(DIMENSION))).await;
    let mock = Arc::new(MockLlm::replying(
        "Stored XSS vulnerability in the comments section: the attacker can inject \
         malicious scripts with the payload <script>alert(1)</script>.",
    ));
    let retriever = Retriever::new(embeddings, index, llm(&mock), Duration::from_secs(5));

    let hyde = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Hyde, 2)
        .await
        .unwrap();
    assert_eq!(hyde.len(), 2);
    assert_eq!(mock.calls(), 1);
    assert!(mock.prompts()[0].contains("vulnerability report or exploit that answers"));
    assert!(mock.prompts()[0].contains(XSS_QUERY));
}

#[tokio::test]
async fn test_blank_hypothetical_document_falls_back() {
    let (embeddings, index) = knowledge_base(Arc::new(HashingEmbedder::new(DIMENSION))).await;
    let retriever = Retriever::new(
        embeddings,
        index,
        llm(&Arc::new(MockLlm::replying("   "))),
        Duration::from_secs(5),
    );

    let hyde = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Hyde, 5)
        .await
        .unwrap();
    let standard = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Standard, 5)
        .await
        .unwrap();
    assert_eq!(hyde, standard);
}

#[tokio::test]
async fn test_empty_index_is_not_an_error() {
    let embeddings =
        EmbeddingProvider::new(Arc::new(HashingEmbedder::new(DIMENSION)), Duration::from_secs(5));
    let retriever = Retriever::new(
        embeddings,
        Arc::new(InMemoryIndex::new(DIMENSION)),
        None,
        Duration::from_secs(5),
    );
    let chunks = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Hyde, 5)
        .await
        .unwrap();
    assert!(chunks.is_empty());
}

#[tokio::test]
async fn test_index_error_surfaces_as_retrieval_failed() {
    let embeddings =
        EmbeddingProvider::new(Arc::new(HashingEmbedder::new(DIMENSION)), Duration::from_secs(5));
    let retriever = Retriever::new(embeddings, Arc::new(BrokenIndex), None, Duration::from_secs(5));

    let err = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Standard, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RetrievalFailed { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_search_timeout_surfaces_as_retrieval_failed() {
    let embeddings =
        EmbeddingProvider::new(Arc::new(HashingEmbedder::new(DIMENSION)), Duration::from_secs(5));
    let retriever = Retriever::new(embeddings, Arc::new(StalledIndex), None, Duration::from_secs(2));

    let err = retriever
        .retrieve(XSS_QUERY, RetrievalStrategy::Standard, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RetrievalFailed { .. }));
}

#[tokio::test]
async fn test_retrieval_failure_still_answers_ungrounded() {
    let embeddings =
        EmbeddingProvider::new(Arc::new(HashingEmbedder::new(DIMENSION)), Duration::from_secs(5));
    let mock = Arc::new(MockLlm::replying("I could not find matching reports."));

    let outcome = pipeline(embeddings, Arc::new(BrokenIndex), llm(&mock))
        .run(XSS_QUERY)
        .await
        .unwrap();

    assert_eq!(outcome.route, RouteDecision::KnowledgeBase);
    assert_eq!(outcome.strategy, Some(RetrievalStrategy::Hyde));
    assert!(outcome.retrieval_error.is_some());
    assert!(!outcome.answer.grounded);
}

#[tokio::test]
async fn test_pipeline_without_llm_is_grounded() {
    let (embeddings, index) = knowledge_base(Arc::new(HashingEmbedder::new(DIMENSION))).await;

    let outcome = pipeline(embeddings, index, None).run(XSS_QUERY).await.unwrap();

    assert_eq!(outcome.route, RouteDecision::KnowledgeBase);
    assert_eq!(outcome.context.len(), 3);
    assert!(outcome.answer.grounded);
    assert_eq!(outcome.answer.sources.len(), 3);
    assert_eq!(outcome.answer.sources[0].severity, "High");
}

#[tokio::test]
async fn test_evaluation_hit_rate() {
    let (embeddings, index) = knowledge_base(Arc::new(HashingEmbedder::new(DIMENSION))).await;
    let retriever = Retriever::new(embeddings, index, None, Duration::from_secs(5));
    let evaluator = RetrievalEvaluator::new(retriever, None);

    let report = evaluator
        .evaluate(&[
            EvaluationCase {
                question: "Which payload triggers the stored XSS?".to_string(),
                expected_snippet: "<script>alert(1)</script>".to_string(),
            },
            EvaluationCase {
                question: "How was the SSRF in the PDF renderer exploited?".to_string(),
                expected_snippet: "169.254.169.254".to_string(),
            },
        ])
        .await;

    assert_eq!(report.total, 2);
    assert_eq!(report.hits, 1);
    assert!((report.hit_rate - 0.5).abs() < f64::EPSILON);
    assert!(report.results[0].hit);
    assert!(!report.results[1].hit);
}

#[tokio::test]
async fn test_generate_questions() {
    let (embeddings, index) = knowledge_base(Arc::new(HashingEmbedder::new(DIMENSION))).await;
    let retriever = Retriever::new(embeddings, index, None, Duration::from_secs(5));

    let mock = Arc::new(MockLlm::replying(
        "1. Which field is vulnerable?\n2. What payload is used?\n3. How is it mitigated?",
    ));
    let evaluator = RetrievalEvaluator::new(retriever.clone(), llm(&mock));
    let report = &MockReportSource::reports(1)[0];

    let questions = evaluator.generate_questions(&report.body_text, 2).await;
    assert_eq!(questions, vec!["Which field is vulnerable?", "What payload is used?"]);

    let offline = RetrievalEvaluator::new(retriever, None);
    assert!(offline.generate_questions(&report.body_text, 2).await.is_empty());
}
