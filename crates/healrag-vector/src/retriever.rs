use tracing::{debug, error};

use healrag_core::traits::Embedder;
use healrag_core::types::QueryResult;

use crate::index::{l2_normalize, ChunkIndex};

/// Search `index` for `query` and reduce the hits to a confidence score.
///
/// Never fails: an absent or empty index, an embedding error or a search
/// error all yield an empty result with confidence 0.0.
pub fn retrieve(
    embedder: &dyn Embedder,
    index: Option<&ChunkIndex>,
    query: &str,
    k: usize,
    score_floor: f32,
) -> QueryResult {
    let Some(index) = index.filter(|i| !i.is_empty()) else {
        return QueryResult::empty();
    };
    match try_retrieve(embedder, index, query, k, score_floor) {
        Ok(result) => result,
        Err(e) => {
            error!("retrieval failed: {e:#}");
            QueryResult::empty()
        }
    }
}

fn try_retrieve(
    embedder: &dyn Embedder,
    index: &ChunkIndex,
    query: &str,
    k: usize,
    score_floor: f32,
) -> anyhow::Result<QueryResult> {
    let mut q = embedder
        .embed_batch(&[query.to_string()])?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))?;
    l2_normalize(&mut q);

    let (scores, ids) = index.index().search(&q, k.min(index.len()))?;
    let kept: Vec<(f32, usize)> = scores.into_iter().zip(ids).filter(|(s, _)| *s > score_floor).collect();
    if kept.is_empty() {
        debug!(query, "no hit cleared the score floor");
        return Ok(QueryResult::empty());
    }
    let confidence = kept.iter().map(|(s, _)| s).sum::<f32>() / kept.len() as f32;
    let documents = kept.into_iter().map(|(_, id)| index.chunks()[id].text.clone()).collect();
    Ok(QueryResult { documents, confidence })
}
