use tracing::{error, info};

use healrag_core::traits::Embedder;
use healrag_core::types::Chunk;

use crate::index::ChunkIndex;

/// Embed `chunks` in one batch into a throwaway index.
///
/// Returns `None` for an empty input or on any embedding/index error.
pub fn build_heal_index(embedder: &dyn Embedder, chunks: Vec<Chunk>) -> Option<ChunkIndex> {
    if chunks.is_empty() {
        return None;
    }
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let built = embedder
        .embed_batch(&texts)
        .and_then(|vectors| ChunkIndex::from_vectors(embedder.dim(), vectors, chunks));
    match built {
        Ok(index) => {
            info!(chunks = index.len(), "built heal index");
            Some(index)
        }
        Err(e) => {
            error!("failed to build heal index: {e:#}");
            None
        }
    }
}
