//! Domain types shared by the retriever, the healing cascade and the engine.

use serde::{Deserialize, Serialize};

/// Attribution used for chunks of the persisted base corpus.
pub const BASE_SOURCE: &str = "knowledge base";

/// A bounded span of text plus the provenance it was recovered from.
///
/// Base chunks are persisted with the base index; healed chunks live only
/// for the request that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self { text: text.into(), source: source.into() }
    }
}

/// Outcome of a single retrieval: matched texts in rank order and the mean
/// score of the results that cleared the floor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub documents: Vec<String>,
    pub confidence: f32,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Per-request healing bookkeeping. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealingSession {
    pub query: String,
    pub sources: Vec<String>,
    pub score_before: f32,
    pub score_after: f32,
    pub triggered: bool,
    pub successful: bool,
}

impl HealingSession {
    pub fn new(query: &str, score_before: f32) -> Self {
        Self {
            query: query.to_string(),
            sources: vec![BASE_SOURCE.to_string()],
            score_before,
            score_after: score_before,
            triggered: false,
            successful: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_use_healing")]
    pub use_healing: bool,
}

fn default_threshold() -> f32 {
    0.5
}

fn default_max_results() -> usize {
    5
}

fn default_use_healing() -> bool {
    true
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            threshold: default_threshold(),
            max_results: default_max_results(),
            use_healing: default_use_healing(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub before_answer: String,
    pub trust_score_before: f32,
    pub trust_score_after: f32,
    pub healing_triggered: bool,
    pub healing_successful: bool,
    pub sources_used: Vec<String>,
    pub timestamp: String,
}

/// Round a score to three decimals for presentation.
pub fn round3(score: f32) -> f32 {
    (score * 1000.0).round() / 1000.0
}
