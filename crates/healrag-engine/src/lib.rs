//! Request orchestration for self-healing retrieval.
//!
//! A [`ServiceContext`] is built once at startup and is read-only
//! afterwards; [`ServiceContext::answer`] runs one request end to end:
//! base retrieval, optional healing, merge policy, answer synthesis.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use healrag_core::config::{expand_path, Settings};
use healrag_core::data_processor::DataProcessor;
use healrag_core::error::Error;
use healrag_core::merge::decide;
use healrag_core::synthesize::{synthesize_or, NO_INFO, NO_INFO_BASE};
use healrag_core::traits::Embedder;
use healrag_core::types::{round3, HealingSession, QueryRequest, QueryResponse};
use healrag_embed::get_default_embedder;
use healrag_heal::HealingCascade;
use healrag_vector::{build_heal_index, load_or_build, retrieve, ChunkIndex, LanceBaseStore};

mod report;

pub use report::{format_report, Report};

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub base_index_size: usize,
    pub base_chunks_count: usize,
}

/// Embedder, base index and healing cascade shared by every request.
pub struct ServiceContext {
    embedder: Box<dyn Embedder>,
    base: ChunkIndex,
    healer: HealingCascade,
    settings: Settings,
}

impl ServiceContext {
    pub fn new(
        embedder: Box<dyn Embedder>,
        base: ChunkIndex,
        healer: HealingCascade,
        settings: Settings,
    ) -> healrag_core::error::Result<Self> {
        if base.index().dim() != embedder.dim() {
            return Err(Error::Operation(format!(
                "base index dim {} does not match embedder dim {}",
                base.index().dim(),
                embedder.dim()
            )));
        }
        Ok(Self { embedder, base, healer, settings })
    }

    /// Load the default embedder, load or build the base index under the
    /// cache directory and wire the live healing cascade.
    pub fn bootstrap(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let embedder = get_default_embedder()?;
        let store = LanceBaseStore::new(&settings.cache.dir_path().join("lancedb"), &settings.cache.table);
        let processor = DataProcessor::new(settings.chunking.clone());
        let data_dir = settings.cache.data_dir.as_ref().map(expand_path);
        let base = load_or_build(&store, embedder.as_ref(), settings.cache.rebuild, || {
            let chunks = match &data_dir {
                Some(dir) => processor.process_directory(dir)?,
                None => Vec::new(),
            };
            if chunks.is_empty() {
                warn!("no corpus files found, indexing the seed corpus");
                return Ok(processor.process_seed());
            }
            Ok(chunks)
        })?;
        let healer = HealingCascade::from_settings(&settings)?;
        info!(vectors = base.len(), "service context ready");
        Ok(Self::new(embedder, base, healer, settings)?)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn health(&self) -> Health {
        Health { status: "healthy", base_index_size: self.base.index().len(), base_chunks_count: self.base.len() }
    }

    /// Answer one request. Fails only on a blank query; every external
    /// failure during healing degrades to the base answer.
    pub fn answer(&self, request: &QueryRequest) -> healrag_core::error::Result<QueryResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let k = if request.max_results == 0 { self.settings.retrieval.k } else { request.max_results };
        let floor = self.settings.retrieval.score_floor;
        let embedder = self.embedder.as_ref();

        let base = retrieve(embedder, Some(&self.base), query, k, floor);
        let mut session = HealingSession::new(query, base.confidence);
        let mut final_docs = base.documents.clone();

        if request.use_healing && base.confidence < request.threshold {
            session.triggered = true;
            info!(score = base.confidence, threshold = request.threshold, "self-healing triggered");
            let (chunks, sources) = self.healer.self_heal(query);
            if let Some(heal_index) = build_heal_index(embedder, chunks) {
                session.sources.extend(sources);
                let healed = retrieve(embedder, Some(&heal_index), query, k, floor);
                let decision =
                    decide(&self.settings.merge, base.confidence, healed.confidence, &base.documents, &healed.documents, k);
                info!(
                    branch = ?decision.branch,
                    before = base.confidence,
                    healed = healed.confidence,
                    after = decision.score,
                    "merge decision"
                );
                session.score_after = decision.score;
                session.successful = decision.successful;
                final_docs = decision.documents;
            } else {
                warn!(query, "self-healing produced no usable content");
            }
        }

        let answer = &self.settings.answer;
        Ok(QueryResponse {
            query: request.query.clone(),
            answer: synthesize_or(&final_docs, answer, NO_INFO),
            before_answer: synthesize_or(&base.documents, answer, NO_INFO_BASE),
            trust_score_before: round3(session.score_before),
            trust_score_after: round3(session.score_after),
            healing_triggered: session.triggered,
            healing_successful: session.successful,
            sources_used: session.sources,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}
