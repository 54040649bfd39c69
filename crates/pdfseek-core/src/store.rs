//! In-memory chunk store keyed by chunk id.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::traits::ChunkStore;
use crate::types::{Chunk, ChunkId};

#[derive(Default)]
struct Inner {
    order: Vec<ChunkId>,
    by_id: HashMap<ChunkId, Chunk>,
}

/// Insertion-ordered chunk store. Re-inserting an existing id replaces the
/// chunk in place.
#[derive(Default)]
pub struct MemoryChunkStore {
    inner: RwLock<Inner>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChunkStore for MemoryChunkStore {
    fn insert(&self, chunks: &[Chunk]) -> anyhow::Result<()> {
        let mut inner = self.write();
        for c in chunks {
            if inner.by_id.insert(c.id.clone(), c.clone()).is_none() {
                inner.order.push(c.id.clone());
            } else {
                debug!(id = %c.id, "replaced existing chunk");
            }
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Option<Chunk> {
        self.read().by_id.get(id).cloned()
    }

    fn len(&self) -> usize {
        self.read().by_id.len()
    }

    fn sources(&self) -> Vec<String> {
        let inner = self.read();
        let mut out: Vec<String> = Vec::new();
        for id in &inner.order {
            if let Some(c) = inner.by_id.get(id) {
                if !out.iter().any(|s| s == &c.source) {
                    out.push(c.source.clone());
                }
            }
        }
        out
    }

    fn chunks_by_source(&self, source: &str) -> Vec<Chunk> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .filter(|c| c.source == source)
            .cloned()
            .collect()
    }

    fn remove_source(&self, source: &str) -> anyhow::Result<usize> {
        let mut inner = self.write();
        let before = inner.by_id.len();
        inner.by_id.retain(|_, c| c.source != source);
        let Inner { order, by_id } = &mut *inner;
        order.retain(|id| by_id.contains_key(id));
        Ok(before - by_id.len())
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut inner = self.write();
        inner.order.clear();
        inner.by_id.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source: &str, page: u32) -> Chunk {
        Chunk {
            id: id.to_string(),
            content: format!("content of {id}"),
            source: source.to_string(),
            page,
            chunk_index: 0,
        }
    }

    #[test]
    fn insert_get_and_sources_keep_ingestion_order() {
        let store = MemoryChunkStore::new();
        store
            .insert(&[chunk("b1", "b.pdf", 1), chunk("a1", "a.pdf", 1), chunk("b2", "b.pdf", 2)])
            .expect("insert");
        assert_eq!(store.len(), 3);
        assert_eq!(store.sources(), vec!["b.pdf".to_string(), "a.pdf".to_string()]);
        assert_eq!(store.get("a1").map(|c| c.page), Some(1));
        assert!(store.get("missing").is_none());
        let ids: Vec<String> = store.chunks_by_source("b.pdf").into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["b1", "b2"]);
    }

    #[test]
    fn reinsert_replaces_without_duplicating() {
        let store = MemoryChunkStore::new();
        store.insert(&[chunk("x", "a.pdf", 1)]).expect("insert");
        store.insert(&[chunk("x", "a.pdf", 7)]).expect("reinsert");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("x").map(|c| c.page), Some(7));
    }

    #[test]
    fn remove_source_and_clear() {
        let store = MemoryChunkStore::new();
        store
            .insert(&[chunk("a1", "a.pdf", 1), chunk("a2", "a.pdf", 2), chunk("b1", "b.pdf", 1)])
            .expect("insert");
        assert_eq!(store.remove_source("a.pdf").expect("remove"), 2);
        assert_eq!(store.remove_source("a.pdf").expect("remove again"), 0);
        assert_eq!(store.sources(), vec!["b.pdf".to_string()]);
        store.clear().expect("clear");
        assert!(store.is_empty());
        assert!(store.sources().is_empty());
    }
}
