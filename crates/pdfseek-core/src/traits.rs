//! Seams to the external collaborators the ranking core reads from.
//!
//! Implementations must tolerate concurrent readers; ingestion and removal
//! are serialized by the implementation itself.

use crate::error::EmbeddingError;
use crate::types::{Chunk, ChunkHit, Neighbor};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

pub trait VectorIndex: Send + Sync {
    fn index(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> anyhow::Result<()>;
    /// Closest `k` chunks to `query_vec`, nearest first.
    fn nearest(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<Neighbor>>;
    fn remove_source(&self, source: &str) -> anyhow::Result<usize>;
    fn clear(&self) -> anyhow::Result<()>;
}

pub trait TermIndex: Send + Sync {
    fn index(&self, chunks: &[Chunk]) -> anyhow::Result<()>;
    /// Best `k` chunks by sparse term score, highest first.
    fn term_score(&self, query: &str, k: usize) -> anyhow::Result<Vec<ChunkHit>>;
    fn remove_source(&self, source: &str) -> anyhow::Result<usize>;
    fn clear(&self) -> anyhow::Result<()>;
}

pub trait ChunkStore: Send + Sync {
    fn insert(&self, chunks: &[Chunk]) -> anyhow::Result<()>;
    fn get(&self, id: &str) -> Option<Chunk>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Distinct sources in first-ingested order.
    fn sources(&self) -> Vec<String>;
    fn chunks_by_source(&self, source: &str) -> Vec<Chunk>;
    fn remove_source(&self, source: &str) -> anyhow::Result<usize>;
    fn clear(&self) -> anyhow::Result<()>;
}
