//! Embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! The cache is consulted before calling the wrapped embedder and written
//! through on misses. It holds at most `capacity` vectors; the oldest entry
//! is evicted first.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use pdfseek_core::error::EmbeddingError;
use pdfseek_core::traits::Embedder;

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Default)]
struct Entries {
    map: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
}

pub struct CachedEmbedder<E> {
    inner: E,
    embedder_id: String,
    capacity: usize,
    entries: RwLock<Entries>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, embedder_id: impl Into<String>) -> Self {
        Self::with_capacity(inner, embedder_id, DEFAULT_CACHE_CAPACITY)
    }

    /// A `capacity` of 0 disables caching.
    pub fn with_capacity(inner: E, embedder_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            inner,
            embedder_id: embedder_id.into(),
            capacity,
            entries: RwLock::new(Entries::default()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    fn key(&self, text: &str) -> String {
        format!("{}:{}", self.embedder_id, blake3::hash(text.as_bytes()).to_hex())
    }
}

impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = self.key(text);
        if let Some(v) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .get(&key)
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(v.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        // failures are not cached so a recovered upstream is retried
        let v = self.inner.embed(text)?;
        if self.capacity == 0 {
            return Ok(v);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.map.insert(key.clone(), v.clone()).is_none() {
            entries.order.push_back(key);
            while entries.order.len() > self.capacity {
                if let Some(oldest) = entries.order.pop_front() {
                    entries.map.remove(&oldest);
                }
            }
        }
        Ok(v)
    }
}
