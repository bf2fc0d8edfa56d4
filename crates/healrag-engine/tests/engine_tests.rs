use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use healrag_core::config::Settings;
use healrag_core::error::Error;
use healrag_core::synthesize::{NO_INFO, NO_INFO_BASE};
use healrag_core::traits::Embedder;
use healrag_core::types::{Chunk, QueryRequest, BASE_SOURCE};
use healrag_engine::{format_report, Report, ServiceContext};
use healrag_heal::{HealOutcome, HealStrategy, HealingCascade};
use healrag_vector::ChunkIndex;

const QUERY: &str = "what is quantum computing";
const BASE_DOC: &str = "Rust is a systems programming language focused on safety and speed.";
const HEAL_DOC: &str = "Quantum computing harnesses superposition and entanglement to process information quickly.";

/// Cosine between a unit query on axis 0 and a unit vector with `cos` on
/// axis 0 and the rest on `axis`.
fn at_cos(cos: f32, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; 4];
    v[0] = cos;
    v[axis] = (1.0 - cos * cos).sqrt();
    v
}

/// Looks texts up in a fixed table; unknown texts land on an axis
/// orthogonal to everything else.
struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    fn new(base_cos: f32, heal_cos: f32) -> Self {
        let mut table = HashMap::new();
        table.insert(QUERY.to_string(), vec![1.0, 0.0, 0.0, 0.0]);
        table.insert(BASE_DOC.to_string(), at_cos(base_cos, 1));
        table.insert(HEAL_DOC.to_string(), at_cos(heal_cos, 2));
        Self { table }
    }
}

impl Embedder for TableEmbedder {
    fn dim(&self) -> usize { 4 }
    fn max_len(&self) -> usize { 512 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.table.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0, 0.0, 1.0])).collect())
    }
}

/// A single stage that either recovers `HEAL_DOC` or misses, counting calls.
struct FixedStage {
    recovers: bool,
    calls: Arc<AtomicUsize>,
}

impl HealStrategy for FixedStage {
    fn name(&self) -> &'static str { "fixed" }
    fn applies(&self, _collected: &[Chunk]) -> bool { true }
    fn attempt(&self, _query: &str, _collected: &[Chunk]) -> HealOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.recovers {
            HealOutcome::Success(vec![Chunk::new(HEAL_DOC, "encyclopedia: Quantum_computing")])
        } else {
            HealOutcome::Miss
        }
    }
}

fn context(base_cos: f32, heal_cos: f32, recovers: bool) -> (ServiceContext, Arc<AtomicUsize>) {
    let embedder = TableEmbedder::new(base_cos, heal_cos);
    let base = ChunkIndex::from_vectors(
        4,
        vec![embedder.table[BASE_DOC].clone()],
        vec![Chunk::new(BASE_DOC, BASE_SOURCE)],
    )
    .expect("base index");
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = Settings::default();
    let stages: Vec<Box<dyn HealStrategy>> = vec![Box::new(FixedStage { recovers, calls: calls.clone() })];
    let healer = HealingCascade::new(
        stages,
        settings.chunking.clone(),
        settings.healing.min_extract_len,
    );
    let ctx = ServiceContext::new(Box::new(embedder), base, healer, settings).expect("context");
    (ctx, calls)
}

fn request(threshold: f32) -> QueryRequest {
    QueryRequest { threshold, ..QueryRequest::new(QUERY) }
}

#[test]
fn weak_base_is_replaced_by_healed_documents() {
    let (ctx, calls) = context(0.2, 0.4, true);
    let resp = ctx.answer(&request(0.5)).expect("answer");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(resp.healing_triggered);
    assert!(resp.healing_successful);
    assert_eq!(resp.trust_score_before, 0.2);
    assert_eq!(resp.trust_score_after, 0.4);
    assert_eq!(resp.answer, HEAL_DOC);
    assert_eq!(resp.before_answer, BASE_DOC);
    assert_eq!(resp.sources_used, vec![BASE_SOURCE.to_string(), "encyclopedia: Quantum_computing".to_string()]);
}

#[test]
fn confident_base_skips_healing() {
    let (ctx, calls) = context(0.6, 0.9, true);
    let resp = ctx.answer(&request(0.5)).expect("answer");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!resp.healing_triggered);
    assert!(!resp.healing_successful);
    assert_eq!(resp.answer, resp.before_answer);
    assert_eq!(resp.trust_score_after, resp.trust_score_before);
    assert_eq!(resp.sources_used, vec![BASE_SOURCE.to_string()]);
}

#[test]
fn exhausted_cascade_leaves_base_untouched() {
    let (ctx, calls) = context(0.2, 0.4, false);
    let resp = ctx.answer(&request(0.5)).expect("answer");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(resp.healing_triggered);
    assert!(!resp.healing_successful);
    assert_eq!(resp.answer, BASE_DOC);
    assert_eq!(resp.trust_score_after, 0.2);
    assert_eq!(resp.sources_used, vec![BASE_SOURCE.to_string()]);
}

#[test]
fn near_equal_scores_merge_both_answers() {
    let (ctx, _) = context(0.5, 0.46, true);
    let resp = ctx.answer(&request(0.6)).expect("answer");

    assert!(resp.healing_successful);
    assert_eq!(resp.trust_score_before, 0.5);
    assert_eq!(resp.trust_score_after, 0.472);
    assert!(resp.answer.contains("Rust is a systems programming language"));
    assert!(resp.answer.contains("Quantum computing harnesses superposition"));
}

#[test]
fn no_base_match_uses_base_fallback_message() {
    let (ctx, _) = context(0.0, 0.8, false);
    let resp = ctx.answer(&request(0.5)).expect("answer");
    assert_eq!(resp.before_answer, NO_INFO_BASE);
    assert_eq!(resp.answer, NO_INFO);
    assert_eq!(resp.trust_score_before, 0.0);
}

#[test]
fn healing_can_be_disabled_per_request() {
    let (ctx, calls) = context(0.2, 0.9, true);
    let req = QueryRequest { use_healing: false, ..request(0.5) };
    let resp = ctx.answer(&req).expect("answer");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!resp.healing_triggered);
    assert_eq!(resp.answer, BASE_DOC);
}

#[test]
fn blank_query_is_rejected() {
    let (ctx, _) = context(0.2, 0.4, true);
    let err = ctx.answer(&QueryRequest::new("   ")).expect_err("blank query");
    assert!(matches!(err, Error::EmptyQuery));
}

#[test]
fn mismatched_base_index_is_rejected() {
    let base = ChunkIndex::from_vectors(2, vec![vec![1.0, 0.0]], vec![Chunk::new(BASE_DOC, BASE_SOURCE)]).expect("base");
    let settings = Settings::default();
    let healer = HealingCascade::new(Vec::new(), settings.chunking.clone(), settings.healing.min_extract_len);
    let err = ServiceContext::new(Box::new(TableEmbedder::new(0.2, 0.4)), base, healer, settings);
    assert!(matches!(err, Err(Error::Operation(_))));
}

#[test]
fn health_reports_base_size() {
    let (ctx, _) = context(0.2, 0.4, true);
    let health = ctx.health();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.base_index_size, 1);
    assert_eq!(health.base_chunks_count, 1);
}

#[test]
fn response_serializes_and_reports() {
    let (ctx, _) = context(0.2, 0.4, true);
    let resp = ctx.answer(&request(0.5)).expect("answer");
    assert!(chrono_like(&resp.timestamp));

    let json = serde_json::to_value(&resp).expect("json");
    assert_eq!(json["query"], QUERY);
    assert_eq!(json["healing_triggered"], true);

    let report = format_report(&resp);
    assert!(report.contains("Trust Score (before): 0.200"));
    assert!(report.contains("Healing Successful: Yes"));
    assert!(report.contains("  - encyclopedia: Quantum_computing"));
    assert!(report.contains(HEAL_DOC));
}

#[test]
fn report_lists_sections_in_order() {
    let (ctx, _) = context(0.6, 0.9, true);
    let resp = ctx.answer(&request(0.5)).expect("answer");
    let report = Report(&resp).to_string();
    assert_eq!(report, format_report(&resp));

    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[0], "Self-Healing Retrieval Query");
    assert_eq!(lines[2], format!("Query: {QUERY}"));
    assert!(report.contains("Healing Triggered: No"));
    assert!(report.contains("  - knowledge base"));
    let before = report.find("BEFORE (Base Knowledge Only):").expect("before section");
    let after = report.find("AFTER (With Self-Healing):").expect("after section");
    assert!(before < after);
    assert_eq!(lines.last().copied(), Some(BASE_DOC));
}

fn chrono_like(ts: &str) -> bool {
    ts.len() >= 20 && ts.as_bytes()[4] == b'-' && ts.contains('T')
}
