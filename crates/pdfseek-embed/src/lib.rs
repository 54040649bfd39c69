//! Reference embedding collaborator.
//!
//! `HashingEmbedder` is a deterministic bag-of-tokens projection that needs no
//! model files, so ingestion and search run offline and reproducibly.
//! `CachedEmbedder` memoises any embedder by content hash.

use std::hash::Hasher;

use anyhow::{anyhow, Result};
use pdfseek_core::error::EmbeddingError;
use pdfseek_core::traits::Embedder;
use twox_hash::XxHash64;

pub mod cache;

pub use cache::CachedEmbedder;

pub const DEFAULT_DIM: usize = 384;

pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(anyhow!("embedding dimension must be non-zero"));
        }
        Ok(Self { dim })
    }

    pub fn embedder_id(&self) -> String {
        format!("hash:xx64:d{}", self.dim)
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.as_bytes());
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64)
                .map_err(|e| EmbeddingError::new(e.to_string()))?;
            #[allow(clippy::cast_precision_loss)]
            let val = 0.5 + ((h >> 32) as u32 as f32) / (u32::MAX as f32);
            v[idx] += val;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Cached hashing embedder; dimension from `APP_EMBED_DIM` (default 384).
pub fn get_default_embedder() -> Result<Box<dyn Embedder>> {
    let dim = match std::env::var("APP_EMBED_DIM") {
        Ok(v) => v
            .parse::<usize>()
            .map_err(|e| anyhow!("invalid APP_EMBED_DIM '{v}': {e}"))?,
        Err(_) => DEFAULT_DIM,
    };
    let inner = HashingEmbedder::new(dim)?;
    let id = inner.embedder_id();
    tracing::debug!(embedder = %id, "using hashing embedder");
    Ok(Box::new(CachedEmbedder::new(inner, id)))
}
