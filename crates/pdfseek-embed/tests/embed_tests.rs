use pdfseek_core::error::EmbeddingError;
use pdfseek_core::traits::Embedder;
use pdfseek_embed::{get_default_embedder, CachedEmbedder, HashingEmbedder};
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn default_embedder_shapes_and_determinism() {
    let embedder = get_default_embedder().expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), embedder.dim());

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

struct CountingEmbedder {
    calls: AtomicUsize,
}

impl Embedder for CountingEmbedder {
    fn dim(&self) -> usize {
        2
    }
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text == "boom" {
            return Err(EmbeddingError::new("upstream down"));
        }
        Ok(vec![1.0, 0.0])
    }
}

#[test]
fn cache_serves_repeats_and_does_not_cache_failures() {
    let cached = CachedEmbedder::new(CountingEmbedder { calls: AtomicUsize::new(0) }, "counting");
    cached.embed("revenue").expect("first");
    cached.embed("revenue").expect("second");
    assert_eq!(cached.stats(), (1, 1));

    assert!(cached.embed("boom").is_err());
    assert!(cached.embed("boom").is_err());
    assert_eq!(cached.stats(), (1, 3));
}

#[test]
fn cache_is_transparent() {
    let plain = HashingEmbedder::new(32).expect("plain");
    let cached = CachedEmbedder::new(HashingEmbedder::new(32).expect("inner"), "h32");
    assert_eq!(plain.embed("fiscal year 2023").unwrap(), cached.embed("fiscal year 2023").unwrap());
    assert_eq!(cached.embedder_id(), "h32");
}

#[test]
fn cache_is_bounded_and_evicts_oldest() {
    let cached = CachedEmbedder::with_capacity(CountingEmbedder { calls: AtomicUsize::new(0) }, "counting", 2);
    for q in ["q1", "q2", "q3", "q4"] {
        cached.embed(q).expect("embed");
    }
    assert_eq!(cached.len(), 2);

    cached.embed("q4").expect("recent entry");
    assert_eq!(cached.stats(), (1, 4));
    cached.embed("q1").expect("evicted entry");
    assert_eq!(cached.stats(), (1, 5));
    assert_eq!(cached.len(), 2);

    let uncached = CachedEmbedder::with_capacity(CountingEmbedder { calls: AtomicUsize::new(0) }, "off", 0);
    uncached.embed("q1").expect("embed");
    assert!(uncached.is_empty());
}
