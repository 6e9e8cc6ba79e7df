//! HTTP API tests against an in-memory pipeline

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use cyberrag_common::config::AppConfig;
use cyberrag_common::embeddings::{EmbeddingProvider, HashingEmbedder};
use cyberrag_common::index::InMemoryIndex;
use cyberrag_common::llm::{LlmClient, MockLlm};
use cyberrag_gateway::{create_router, AppState};
use cyberrag_ingestion::source::MockReportSource;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app_with(config: AppConfig, llm: Option<Arc<MockLlm>>) -> Router {
    let dimension = config.embedding.dimension;
    let embeddings = EmbeddingProvider::new(
        Arc::new(HashingEmbedder::new(dimension)),
        Duration::from_secs(5),
    );
    let llm = llm.map(|mock| LlmClient::new(mock, Duration::from_secs(5)));
    let state = AppState::build(
        config,
        embeddings,
        Arc::new(InMemoryIndex::new(dimension)),
        llm,
        Arc::new(MockReportSource),
    )
    .unwrap();
    create_router(state)
}

fn app(llm: Option<Arc<MockLlm>>) -> Router {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = false;
    app_with(config, llm)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app(None);
    let (status, body) = send(&app, "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_index_size() {
    let app = app(None);
    send(&app, "POST", "/v1/ingest", Some(json!({}))).await;

    let (status, body) = send(&app, "GET", "/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["index"]["records"], 3);
    assert_eq!(body["checks"]["embedding_model"], "feature-hashing");
    assert!(body["checks"]["llm_model"].is_null());
}

#[tokio::test]
async fn test_ingest_from_source() {
    let app = app(None);
    let (status, body) = send(&app, "POST", "/v1/ingest", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
    assert_eq!(body["strategy"], "recursive");
    assert_eq!(body["reports_processed"], 3);
    assert_eq!(body["chunks_indexed"], 3);

    // Same reports again: same records
    send(&app, "POST", "/v1/ingest", Some(json!({}))).await;
    let (_, ready) = send(&app, "GET", "/v1/ready", None).await;
    assert_eq!(ready["checks"]["index"]["records"], 3);
}

#[tokio::test]
async fn test_ingest_posted_reports() {
    let app = app(None);
    let report = json!({
        "id": "2345678",
        "title": "SSRF via image proxy",
        "body_text": "The image proxy fetches arbitrary URLs, including http://169.254.169.254/.",
        "severity": "critical",
        "bounty": 2500.0,
        "published_at": "2025-11-02T10:00:00Z",
        "cve": null,
        "attack_vector": "Web",
        "technique": "Server-Side Request Forgery (SSRF)",
        "source_link": "https://hackerone.com/reports/2345678"
    });

    let (status, body) = send(
        &app,
        "POST",
        "/v1/ingest",
        Some(json!({"reports": [report], "strategy": "whole_document"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "request");
    assert_eq!(body["strategy"], "whole_document");
    assert_eq!(body["chunks_indexed"], 1);
}

#[tokio::test]
async fn test_ingest_rejects_empty_report_list() {
    let app = app(None);
    let (status, body) = send(&app, "POST", "/v1/ingest", Some(json!({"reports": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_route_keyword_override() {
    let mock = Arc::new(MockLlm::replying("direct_answer"));
    let app = app(Some(mock.clone()));

    let (status, body) = send(
        &app,
        "POST",
        "/v1/route",
        Some(json!({"query": "Quais técnicas de XSS recentes foram encontradas?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"], "knowledge_base");
    assert_eq!(body["matched_keyword"], "xss");
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_retrieve_orders_by_score() {
    let app = app(None);
    send(&app, "POST", "/v1/ingest", Some(json!({}))).await;

    let (status, body) = send(
        &app,
        "POST",
        "/v1/retrieve",
        Some(json!({"query": "stored xss payload", "strategy": "hybrid", "k": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strategy"], "hybrid");
    assert_eq!(body["total_results"], 3);

    let results = body["results"].as_array().unwrap();
    let scores: Vec<f64> = results
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
    assert!(results[0]["metadata"]["link"]
        .as_str()
        .unwrap()
        .starts_with("https://hackerone.com/reports/"));
}

#[tokio::test]
async fn test_retrieve_validation() {
    let app = app(None);

    let (status, _) = send(&app, "POST", "/v1/retrieve", Some(json!({"query": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/v1/retrieve",
        Some(json!({"query": "xss", "k": 500})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_query_greeting_answers_directly() {
    let mock = Arc::new(MockLlm::scripted(vec![
        Ok("direct_answer".to_string()),
        Ok("Tudo bem!".to_string()),
    ]));
    let app = app(Some(mock));

    let (status, body) = send(
        &app,
        "POST",
        "/v1/query",
        Some(json!({"query": "Olá, como vai?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"], "direct_answer");
    assert!(body["strategy"].is_null());
    assert_eq!(body["context"].as_array().unwrap().len(), 0);
    assert_eq!(body["answer"]["text"], "Tudo bem!");
    assert_eq!(body["answer"]["grounded"], false);
}

#[tokio::test]
async fn test_query_security_question_is_grounded() {
    let app = app(None);
    send(&app, "POST", "/v1/ingest", Some(json!({}))).await;

    let (status, body) = send(
        &app,
        "POST",
        "/v1/query",
        Some(json!({"query": "Quais técnicas de XSS recentes foram encontradas?", "k": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["route"], "knowledge_base");
    assert_eq!(body["strategy"], "hyde");
    assert_eq!(body["context"].as_array().unwrap().len(), 2);
    assert_eq!(body["answer"]["grounded"], true);
    assert_eq!(body["answer"]["sources"][0]["severity"], "High");
}

#[tokio::test]
async fn test_query_llm_failure_is_bad_gateway() {
    let app = app(Some(Arc::new(MockLlm::failing())));
    let (status, body) = send(&app, "POST", "/v1/query", Some(json!({"query": "xss"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "LLM_UNAVAILABLE");
}

#[tokio::test]
async fn test_rate_limit() {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst = 1;
    let app = app_with(config, None);

    let body = json!({"query": "xss"});
    let (first, _) = send(&app, "POST", "/v1/route", Some(body.clone())).await;
    let (second, _) = send(&app, "POST", "/v1/route", Some(body)).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);

    // Health checks bypass the limiter
    let (status, _) = send(&app, "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
}
