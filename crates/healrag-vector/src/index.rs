//! Exact inner-product index over L2-normalized vectors.
//!
//! Because every stored vector has unit length, the inner product with a
//! normalized query equals cosine similarity and lies in `[-1, 1]`.

use anyhow::{Result, anyhow, bail};
use std::cmp::Ordering;

use healrag_core::types::Chunk;

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, vectors: Vec::new() }
    }

    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { self.vectors.len() }
    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }
    pub fn vectors(&self) -> &[Vec<f32>] { &self.vectors }

    /// Append vectors, normalizing each. Ids are assigned in insertion order.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            bail!("vector dim {} does not match index dim {}", bad.len(), self.dim);
        }
        for mut v in vectors {
            l2_normalize(&mut v);
            self.vectors.push(v);
        }
        Ok(())
    }

    /// Top-`k` ids by inner product, best first, as `(scores, ids)`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<(Vec<f32>, Vec<usize>)> {
        if query.len() != self.dim {
            return Err(anyhow!("query dim {} does not match index dim {}", query.len(), self.dim));
        }
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| (id, v.iter().zip(query).map(|(a, b)| a * b).sum::<f32>()))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored.into_iter().map(|(id, s)| (s, id)).unzip())
    }
}

/// An index together with the chunks its ids point at.
#[derive(Debug, Clone)]
pub struct ChunkIndex {
    index: FlatIpIndex,
    chunks: Vec<Chunk>,
}

impl ChunkIndex {
    pub fn new(index: FlatIpIndex, chunks: Vec<Chunk>) -> Result<Self> {
        if index.len() != chunks.len() {
            bail!("index holds {} vectors but {} chunks were given", index.len(), chunks.len());
        }
        Ok(Self { index, chunks })
    }

    /// Embed-free constructor for callers that already hold vectors.
    pub fn from_vectors(dim: usize, vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<Self> {
        let mut index = FlatIpIndex::new(dim);
        index.add(vectors)?;
        Self::new(index, chunks)
    }

    pub fn index(&self) -> &FlatIpIndex { &self.index }
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }
    pub fn len(&self) -> usize { self.chunks.len() }
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }
}
