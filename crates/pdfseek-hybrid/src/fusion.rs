//! Weighted fusion of the semantic and keyword result lists.
//!
//! Each list is min-max normalized on its own, the two are unioned by merge
//! key, and every entry gets
//!
//! ```text
//! score = min(1, (w_sem * sem + w_kw * kw) * bonus)
//! ```
//!
//! where `bonus` is the co-occurrence multiplier when both normalized
//! signals are positive and `1.0` otherwise. Entries keep their order of
//! first appearance (semantic list first) on ties.

use std::cmp::Ordering;
use std::collections::HashMap;

use pdfseek_core::config::{MergeStrategy, SearchConfig};
use pdfseek_core::types::{Chunk, FusedResult, ScoredChunk, SearchType};

use crate::normalize::normalize;
use crate::weights::Weights;

#[derive(Debug, Clone, PartialEq)]
pub struct FusionOptions {
    pub co_occurrence_bonus: f32,
    pub merge_strategy: MergeStrategy,
    pub prefix_chars: usize,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for FusionOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            co_occurrence_bonus: config.co_occurrence_bonus,
            merge_strategy: config.merge_strategy,
            prefix_chars: config.merge_key_prefix_chars,
        }
    }
}

/// Identity used to recognise the same chunk surfaced by both signals.
pub fn merge_key(chunk: &Chunk, opts: &FusionOptions) -> String {
    match opts.merge_strategy {
        MergeStrategy::ChunkId => chunk.id.clone(),
        MergeStrategy::ContentPrefix => {
            let prefix: String = chunk.content.chars().take(opts.prefix_chars).collect();
            format!("{}_{}_{}", chunk.source, chunk.page, prefix)
        }
    }
}

struct Candidate {
    chunk: Chunk,
    semantic: f32,
    keyword: f32,
}

/// Fuse two raw, signal-specific result lists into one ranked list.
///
/// Either input may be empty; the other then ranks alone. A key repeated
/// within one list keeps its best score.
pub fn fuse(
    semantic: &[ScoredChunk],
    keyword: &[ScoredChunk],
    weights: Weights,
    opts: &FusionOptions,
) -> Vec<FusedResult> {
    let mut semantic = semantic.to_vec();
    let mut keyword = keyword.to_vec();
    normalize(&mut semantic);
    normalize(&mut keyword);

    let mut candidates: Vec<Candidate> = Vec::with_capacity(semantic.len() + keyword.len());
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for r in semantic {
        let key = merge_key(&r.chunk, opts);
        match by_key.get(&key) {
            Some(&i) => candidates[i].semantic = candidates[i].semantic.max(r.score),
            None => {
                by_key.insert(key, candidates.len());
                candidates.push(Candidate { chunk: r.chunk, semantic: r.score, keyword: 0.0 });
            }
        }
    }
    for r in keyword {
        let key = merge_key(&r.chunk, opts);
        match by_key.get(&key) {
            Some(&i) => candidates[i].keyword = candidates[i].keyword.max(r.score),
            None => {
                by_key.insert(key, candidates.len());
                candidates.push(Candidate { chunk: r.chunk, semantic: 0.0, keyword: r.score });
            }
        }
    }

    let mut fused: Vec<FusedResult> = candidates
        .into_iter()
        .map(|c| {
            let score = combine(c.semantic, c.keyword, weights, opts.co_occurrence_bonus);
            FusedResult {
                chunk: c.chunk,
                semantic_score: c.semantic,
                keyword_score: c.keyword,
                score,
                search_type: SearchType::Hybrid,
            }
        })
        .collect();

    // stable sort keeps first-appearance order on ties
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    fused
}

/// Weighted sum of two normalized scores with the co-occurrence bonus,
/// capped at `1.0`.
pub fn combine(semantic: f32, keyword: f32, weights: Weights, co_occurrence_bonus: f32) -> f32 {
    let bonus = if semantic > 0.0 && keyword > 0.0 { co_occurrence_bonus } else { 1.0 };
    ((weights.semantic * semantic + weights.keyword * keyword) * bonus).clamp(0.0, 1.0)
}
