//! Query routing
//!
//! Security questions always go to the knowledge base. Anything else is
//! classified by the LLM; when the LLM is missing, fails or answers something
//! unrecognizable, the knowledge base is the safe default.

use cyberrag_common::llm::LlmClient;
use cyberrag_common::metrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument, warn};

/// Terms that force a knowledge-base lookup (English and Portuguese)
pub const SECURITY_KEYWORDS: &[&str] = &[
    "xss", "injection", "sql", "csrf", "ssrf", "rce", "lfi", "rfi",
    "vulnerability", "vulnerabilidade", "exploit", "payload", "attack",
    "ataque", "hack", "breach", "leak", "vazamento", "cve", "cwe",
    "owasp", "llm", "prompt", "bypass", "escalation", "privilege",
    "authentication", "authorization", "disclosure", "sensitive",
    "critical", "crítica", "high", "severity", "bounty", "report",
    "relatório", "hackerone", "bugbounty", "pentest", "redteam",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    KnowledgeBase,
    WebSearch,
    DirectAnswer,
}

impl RouteDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDecision::KnowledgeBase => "knowledge_base",
            RouteDecision::WebSearch => "web_search",
            RouteDecision::DirectAnswer => "direct_answer",
        }
    }
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First security keyword contained in the query, if any
pub fn matched_keyword(query: &str) -> Option<&'static str> {
    let lowered = query.to_lowercase();
    SECURITY_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| lowered.contains(keyword))
}

/// Map a free-form LLM label onto a route
pub fn classify_response(text: &str) -> RouteDecision {
    let lowered = text.trim().to_lowercase();
    if lowered.contains("knowledge") {
        RouteDecision::KnowledgeBase
    } else if lowered.contains("web") {
        RouteDecision::WebSearch
    } else if lowered.contains("direct") {
        RouteDecision::DirectAnswer
    } else {
        RouteDecision::KnowledgeBase
    }
}

fn classification_prompt(query: &str) -> String {
    format!(
        "Decide the best information-retrieval strategy for the question below.\n\n\
         Question: {}\n\n\
         Options:\n\
         - \"knowledge_base\": the question is about specific reports, technical details of indexed vulnerabilities, or a lookup in a security database.\n\
         - \"web_search\": the question needs very recent news (e.g. this week), quotes, or facts outside static knowledge.\n\
         - \"direct_answer\": a simple conceptual question (e.g. what is XSS?), a greeting, or anything answerable without context.\n\n\
         Reply with ONLY one of: knowledge_base, web_search, direct_answer.",
        query
    )
}

#[derive(Clone)]
pub struct QueryRouter {
    llm: Option<LlmClient>,
}

impl QueryRouter {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    #[instrument(skip(self))]
    pub async fn route(&self, query: &str) -> RouteDecision {
        let decision = self.decide(query).await;
        metrics::record_route(decision.as_str());
        decision
    }

    async fn decide(&self, query: &str) -> RouteDecision {
        if let Some(keyword) = matched_keyword(query) {
            info!(keyword, "Security keyword detected, routing to knowledge base");
            return RouteDecision::KnowledgeBase;
        }

        let Some(llm) = &self.llm else {
            return RouteDecision::KnowledgeBase;
        };

        match llm.complete(&classification_prompt(query)).await {
            Ok(answer) => {
                let decision = classify_response(&answer);
                info!(raw = %answer.trim(), decision = %decision, "Router decision");
                decision
            }
            Err(e) => {
                warn!(error = %e, "Router classification failed, defaulting to knowledge base");
                RouteDecision::KnowledgeBase
            }
        }
    }
}
