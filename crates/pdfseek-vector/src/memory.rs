use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{bail, Result};
use tracing::debug;

use pdfseek_core::traits::VectorIndex;
use pdfseek_core::types::{Chunk, ChunkId, Neighbor};

struct Row {
    id: ChunkId,
    source: String,
    vector: Vec<f32>,
}

#[derive(Default)]
struct Inner {
    rows: Vec<Row>,
    /// Position of each id in `rows`.
    pos: HashMap<ChunkId, usize>,
    dim: Option<usize>,
}

impl Inner {
    fn reindex_positions(&mut self) {
        self.pos = self.rows.iter().enumerate().map(|(i, r)| (r.id.clone(), i)).collect();
    }
}

#[derive(Default)]
pub struct MemoryVectorIndex {
    inner: RwLock<Inner>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VectorIndex for MemoryVectorIndex {
    fn index(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            bail!(
                "chunk/embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            );
        }
        let mut guard = self.write();
        let inner = &mut *guard;
        let mut dim = inner.dim;
        for e in embeddings {
            match dim {
                Some(d) if d != e.len() => {
                    bail!("embedding dimension mismatch: expected {d}, got {}", e.len())
                }
                None => dim = Some(e.len()),
                Some(_) => {}
            }
        }
        inner.dim = dim;
        for (c, e) in chunks.iter().zip(embeddings) {
            // re-indexing a chunk replaces its vector in place
            if let Some(&i) = inner.pos.get(&c.id) {
                let row = &mut inner.rows[i];
                row.source.clone_from(&c.source);
                row.vector.clone_from(e);
            } else {
                let i = inner.rows.len();
                inner.pos.insert(c.id.clone(), i);
                inner.rows.push(Row { id: c.id.clone(), source: c.source.clone(), vector: e.clone() });
            }
        }
        Ok(())
    }

    fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query_vec.is_empty() {
            bail!("query embedding is empty");
        }
        let inner = self.read();
        if let Some(d) = inner.dim {
            if d != query_vec.len() {
                bail!("query embedding dimension mismatch: expected {d}, got {}", query_vec.len());
            }
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = Vec::with_capacity(inner.rows.len());
        for row in &inner.rows {
            let Some(cosine) = cosine_similarity(query_vec, &row.vector) else {
                debug!(id = %row.id, "skipping zero-norm embedding");
                continue;
            };
            scored.push(Neighbor { id: row.id.clone(), distance: 1.0 - cosine });
        }
        // stable: equal distances keep insertion order
        scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    fn remove_source(&self, source: &str) -> Result<usize> {
        let mut inner = self.write();
        let before = inner.rows.len();
        inner.rows.retain(|r| r.source != source);
        let removed = before - inner.rows.len();
        if removed > 0 {
            inner.reindex_positions();
        }
        Ok(removed)
    }

    fn clear(&self) -> Result<()> {
        *self.write() = Inner::default();
        Ok(())
    }
}

/// Cosine similarity in `[-1, 1]`, or `None` when either side has no
/// magnitude or the lengths differ.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> Option<f32> {
    if left.len() != right.len() || left.is_empty() {
        return None;
    }

    let mut dot = 0.0_f32;
    let mut left_norm_sq = 0.0_f32;
    let mut right_norm_sq = 0.0_f32;

    for (a, b) in left.iter().zip(right.iter()) {
        dot += a * b;
        left_norm_sq += a * a;
        right_norm_sq += b * b;
    }

    let denom = left_norm_sq.sqrt() * right_norm_sq.sqrt();
    if denom <= f32::EPSILON {
        return None;
    }

    Some((dot / denom).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            content: String::new(),
            source: source.to_string(),
            page: 1,
            chunk_index: 0,
        }
    }

    #[test]
    fn nearest_orders_by_distance() {
        let index = MemoryVectorIndex::new();
        index
            .index(
                &[chunk("far", "a.pdf"), chunk("near", "a.pdf"), chunk("mid", "b.pdf")],
                &[vec![-1.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0]],
            )
            .expect("index");

        let hits = index.nearest(&[1.0, 0.0], 10).expect("nearest");
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(hits[0].distance.abs() < 1e-6);
        assert!((hits[0].similarity() - 1.0).abs() < 1e-6);
        assert!((hits[2].distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn nearest_truncates_and_handles_zero_k() {
        let index = MemoryVectorIndex::new();
        index
            .index(&[chunk("a", "a.pdf"), chunk("b", "a.pdf")], &[vec![1.0, 0.0], vec![0.0, 1.0]])
            .expect("index");
        assert_eq!(index.nearest(&[1.0, 0.0], 1).expect("k=1").len(), 1);
        assert!(index.nearest(&[1.0, 0.0], 0).expect("k=0").is_empty());
    }

    #[test]
    fn zero_norm_rows_are_skipped() {
        let index = MemoryVectorIndex::new();
        index
            .index(&[chunk("blank", "a.pdf"), chunk("x", "a.pdf")], &[vec![0.0, 0.0], vec![1.0, 0.0]])
            .expect("index");
        let hits = index.nearest(&[1.0, 0.0], 10).expect("nearest");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "x");
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let index = MemoryVectorIndex::new();
        index.index(&[chunk("a", "a.pdf")], &[vec![1.0, 0.0]]).expect("index");
        let err = index.nearest(&[1.0, 0.0, 0.0], 5).unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
        assert!(index.index(&[chunk("b", "a.pdf")], &[vec![1.0]]).is_err());
        assert!(index.nearest(&[], 5).is_err());
    }

    #[test]
    fn reindex_replaces_and_remove_source_counts() {
        let index = MemoryVectorIndex::new();
        index
            .index(&[chunk("a", "a.pdf"), chunk("b", "b.pdf")], &[vec![1.0, 0.0], vec![0.0, 1.0]])
            .expect("index");
        index.index(&[chunk("a", "a.pdf")], &[vec![0.0, 1.0]]).expect("reindex");
        assert_eq!(index.len(), 2);
        assert_eq!(index.remove_source("a.pdf").expect("remove"), 1);
        assert_eq!(index.len(), 1);
        index.clear().expect("clear");
        assert!(index.is_empty());
    }

    #[test]
    fn reindexing_keeps_one_row_per_id() {
        let index = MemoryVectorIndex::new();
        let chunks = [chunk("a", "a.pdf"), chunk("b", "a.pdf"), chunk("c", "b.pdf")];
        let vectors = [vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
        index.index(&chunks, &vectors).expect("index");
        for _ in 0..3 {
            index.index(&chunks, &vectors).expect("reindex batch");
        }
        assert_eq!(index.len(), 3);

        // replaced in place: "b" now points the other way and keeps its slot
        index.index(&[chunk("b", "a.pdf")], &[vec![1.0, 0.0]]).expect("replace");
        let hits = index.nearest(&[1.0, 0.0], 10).expect("nearest");
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        // positions survive a removal in the middle
        assert_eq!(index.remove_source("a.pdf").expect("remove"), 2);
        index.index(&[chunk("c", "b.pdf")], &[vec![0.0, 1.0]]).expect("replace after removal");
        index.index(&[chunk("d", "b.pdf")], &[vec![1.0, 0.0]]).expect("append after removal");
        assert_eq!(index.len(), 2);
        let hits = index.nearest(&[0.0, 1.0], 1).expect("nearest");
        assert_eq!(hits[0].id, "c");
    }
}
