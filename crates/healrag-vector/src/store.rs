//! Persisted base index: a LanceDB table of (position, source, content,
//! vector) rows under the cache directory, behind a load-or-build contract.

use anyhow::{Result, anyhow};
use arrow_array::cast::AsArray;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::connect;
use lancedb::query::ExecutableQuery;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use healrag_core::error::Error;
use healrag_core::traits::Embedder;
use healrag_core::types::Chunk;

use crate::index::{ChunkIndex, FlatIpIndex};
use crate::schema::build_chunk_schema;

const EMBED_BATCH: usize = 32;

/// Narrow persistence interface for the base index.
pub trait BaseIndexStore {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<ChunkIndex>>;
    fn persist(&self, index: &ChunkIndex) -> Result<()>;
}

/// Embed `chunks` in batches and index them in order.
pub fn build_base_index(embedder: &dyn Embedder, chunks: Vec<Chunk>) -> Result<ChunkIndex> {
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?.progress_chars("#>-"));
    let mut index = FlatIpIndex::new(embedder.dim());
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        index.add(embedder.embed_batch(&texts)?)?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    info!(vectors = index.len(), "built base index");
    ChunkIndex::new(index, chunks)
}

/// Load the persisted index unless `rebuild` is set or it is missing or
/// was built with a different embedding width; otherwise build from
/// `corpus` and persist.
pub fn load_or_build<S, F>(store: &S, embedder: &dyn Embedder, rebuild: bool, corpus: F) -> Result<ChunkIndex>
where
    S: BaseIndexStore + ?Sized,
    F: FnOnce() -> Result<Vec<Chunk>>,
{
    if !rebuild {
        match store.load() {
            Ok(Some(index)) if index.index().dim() == embedder.dim() => {
                info!(vectors = index.len(), "loaded cached base index");
                return Ok(index);
            }
            Ok(Some(index)) => warn!(cached = index.index().dim(), embedder = embedder.dim(), "cached base index has a different dim, rebuilding"),
            Ok(None) => info!("no cached base index, building from scratch"),
            Err(e) => warn!("failed to load cached base index, rebuilding: {e:#}"),
        }
    }
    let chunks = corpus()?;
    if chunks.is_empty() {
        return Err(Error::EmptyIndex.into());
    }
    let index = build_base_index(embedder, chunks)?;
    store.persist(&index)?;
    Ok(index)
}

fn chunk_id(position: usize, chunk: &Chunk) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(position as u64).to_le_bytes());
    hasher.update(chunk.source.as_bytes());
    hasher.update(chunk.text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

pub struct LanceBaseStore { db_path: PathBuf, table_name: String }

impl LanceBaseStore {
    pub fn new(db_path: &Path, table_name: &str) -> Self {
        Self { db_path: db_path.to_path_buf(), table_name: table_name.to_string() }
    }

    pub async fn load_async(&self) -> Result<Option<ChunkIndex>> {
        if !self.db_path.exists() { return Ok(None); }
        let db = connect(self.db_path.to_string_lossy().as_ref()).execute().await?;
        if !db.table_names().execute().await?.contains(&self.table_name) { return Ok(None); }
        let table = db.open_table(&self.table_name).execute().await?;
        let mut rows: Vec<(i32, Chunk, Vec<f32>)> = Vec::new();
        let mut dim = 0usize;
        let mut stream = table.query().execute().await?;
        while let Some(batch) = stream.try_next().await? {
            let position = batch.column_by_name("position").and_then(|c| c.as_any().downcast_ref::<Int32Array>()).ok_or_else(|| anyhow!("missing position column"))?;
            let source = batch.column_by_name("source").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("missing source column"))?;
            let content = batch.column_by_name("content").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow!("missing content column"))?;
            let vectors = batch.column_by_name("vector").and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>()).ok_or_else(|| anyhow!("missing vector column"))?;
            dim = vectors.value_length() as usize;
            for i in 0..batch.num_rows() {
                let list = vectors.value(i);
                let v = list.as_primitive::<arrow_array::types::Float32Type>().values().to_vec();
                rows.push((position.value(i), Chunk::new(content.value(i), source.value(i)), v));
            }
        }
        if rows.is_empty() { return Ok(None); }
        rows.sort_by_key(|(p, _, _)| *p);
        let (chunks, vectors): (Vec<Chunk>, Vec<Vec<f32>>) = rows.into_iter().map(|(_, c, v)| (c, v)).unzip();
        Ok(Some(ChunkIndex::from_vectors(dim, vectors, chunks)?))
    }

    /// Replace whatever is stored with `index`.
    pub async fn persist_async(&self, index: &ChunkIndex) -> Result<()> {
        if index.is_empty() { warn!("refusing to persist an empty base index"); return Ok(()); }
        if self.db_path.exists() { std::fs::remove_dir_all(&self.db_path)?; }
        std::fs::create_dir_all(&self.db_path)?;
        let db = connect(self.db_path.to_string_lossy().as_ref()).execute().await?;
        let batch = self.to_record_batch(index)?; let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        db.create_table(&self.table_name, reader).execute().await?;
        info!(rows = index.len(), path = %self.db_path.display(), "persisted base index");
        Ok(())
    }

    fn to_record_batch(&self, index: &ChunkIndex) -> Result<RecordBatch> {
        let dim = i32::try_from(index.index().dim())?;
        let chunks = index.chunks();
        let ids: Vec<String> = chunks.iter().enumerate().map(|(i, c)| chunk_id(i, c)).collect();
        let positions = (0..chunks.len()).map(i32::try_from).collect::<Result<Vec<i32>, _>>()?;
        let sources: Vec<String> = chunks.iter().map(|c| c.source.clone()).collect();
        let contents: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = index.index().vectors().iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
        Ok(RecordBatch::try_new(build_chunk_schema(dim), vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(Int32Array::from(positions)),
            Arc::new(StringArray::from(sources)),
            Arc::new(StringArray::from(contents)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
        ])?)
    }
}

impl BaseIndexStore for LanceBaseStore {
    fn load(&self) -> Result<Option<ChunkIndex>> {
        tokio::runtime::Runtime::new()?.block_on(self.load_async())
    }

    fn persist(&self, index: &ChunkIndex) -> Result<()> {
        tokio::runtime::Runtime::new()?.block_on(self.persist_async(index))
    }
}
