//! Domain types shared by the retrieval collaborators and the ranking core.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChunkId = String;

/// A retrievable unit of document text produced at ingestion time.
///
/// - `id`: unique chunk identifier
/// - `content`: the text payload of the chunk
/// - `source`: originating document identifier (e.g. the PDF file name)
/// - `page`: 1-based page number the text was extracted from
/// - `chunk_index`: position of the chunk within its page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    pub source: String,
    pub page: u32,
    #[serde(default)]
    pub chunk_index: usize,
}

/// Which signal produced a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Semantic,
    Keyword,
    Hybrid,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Keyword => "keyword",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw hit returned by a term index: chunk id plus a non-negative,
/// unbounded term-weighting score. Higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkHit {
    pub id: ChunkId,
    pub score: f32,
}

/// Raw hit returned by a vector index. `distance` is a cosine distance,
/// so the similarity used for ranking is `1 - distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: ChunkId,
    pub distance: f32,
}

impl Neighbor {
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// A chunk scored by a single signal. Lives for the duration of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub search_type: SearchType,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, score: f32, search_type: SearchType) -> Self {
        Self { chunk, score, search_type }
    }
}

/// A chunk after both signals have been normalized and combined.
///
/// `semantic_score` and `keyword_score` are the normalized per-signal
/// contributions in `[0, 1]`; `score` is the fused value used for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub chunk: Chunk,
    pub semantic_score: f32,
    pub keyword_score: f32,
    pub score: f32,
    pub search_type: SearchType,
}

impl FusedResult {
    /// Wrap a single-signal result so it can flow through the same
    /// ranking and aggregation paths as fused ones.
    pub fn from_single(scored: ScoredChunk) -> Self {
        let (semantic_score, keyword_score) = match scored.search_type {
            SearchType::Keyword => (0.0, scored.score),
            SearchType::Semantic | SearchType::Hybrid => (scored.score, 0.0),
        };
        Self {
            chunk: scored.chunk,
            semantic_score,
            keyword_score,
            score: scored.score,
            search_type: scored.search_type,
        }
    }
}

/// Composite relevance judgment for one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAggregate {
    pub source: String,
    pub max_score: f32,
    pub avg_score: f32,
    pub median_score: f32,
    pub top3_avg: f32,
    pub chunk_count: usize,
    /// Distinct pages touched, ascending.
    pub pages: Vec<u32>,
    /// Content of the highest-scoring chunk.
    pub best_chunk: String,
    pub relevance_score: f32,
    pub page_bonus: f32,
    pub density_adjustment: f32,
    pub consistency_bonus: f32,
    pub score: f32,
    pub search_type: SearchType,
}

/// Chunk-level result as exposed to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    pub score: f32,
    pub source: String,
    pub page: u32,
    pub search_type: SearchType,
}

impl From<&FusedResult> for SearchResult {
    fn from(r: &FusedResult) -> Self {
        Self {
            content: r.chunk.content.clone(),
            score: r.score,
            source: r.chunk.source.clone(),
            page: r.chunk.page,
            search_type: r.search_type,
        }
    }
}

/// File-level result as exposed to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSearchResult {
    pub source: String,
    pub score: f32,
    pub max_score: f32,
    pub avg_score: f32,
    pub chunk_count: usize,
    pub best_chunk: String,
    pub pages: Vec<u32>,
    pub search_type: SearchType,
}

impl From<&FileAggregate> for FileSearchResult {
    fn from(f: &FileAggregate) -> Self {
        Self {
            source: f.source.clone(),
            score: f.score,
            max_score: f.max_score,
            avg_score: f.avg_score,
            chunk_count: f.chunk_count,
            best_chunk: f.best_chunk.clone(),
            pages: f.pages.clone(),
            search_type: f.search_type,
        }
    }
}
