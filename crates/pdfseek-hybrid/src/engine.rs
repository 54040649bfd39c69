use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use pdfseek_core::config::SearchConfig;
use pdfseek_core::store::MemoryChunkStore;
use pdfseek_core::traits::{ChunkStore, Embedder, TermIndex, VectorIndex};
use pdfseek_core::types::{
    Chunk, FileAggregate, FileSearchResult, FusedResult, ScoredChunk, SearchResult, SearchType,
};
use pdfseek_core::{EmbeddingError, Error, Result};

use crate::aggregate::aggregate_by_file;
use crate::fusion::{fuse, FusionOptions};
use crate::normalize::normalize;
use crate::weights::{select_weights, Weights};

/// Which signals a request ranks with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Semantic,
    Keyword,
    #[default]
    Hybrid,
}

impl SearchMode {
    fn search_type(self) -> SearchType {
        match self {
            Self::Semantic => SearchType::Semantic,
            Self::Keyword => SearchType::Keyword,
            Self::Hybrid => SearchType::Hybrid,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.search_type().as_str())
    }
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "keyword" => Ok(Self::Keyword),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(Error::InvalidConfig(format!(
                "unknown search mode '{other}' (expected semantic, keyword or hybrid)"
            ))),
        }
    }
}

/// One chunk- or file-level query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Falls back to `SearchConfig::default_top_k`.
    pub top_k: Option<usize>,
    #[serde(default)]
    pub mode: SearchMode,
    /// Overrides the adaptive weight split in hybrid mode.
    pub semantic_weight: Option<f32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), top_k: None, mode: SearchMode::default(), semantic_weight: None }
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn semantic_weight(mut self, w: f32) -> Self {
        self.semantic_weight = Some(w);
        self
    }
}

/// Orchestrates embedding, both retrieval signals, fusion and file
/// aggregation over a set of collaborators.
///
/// Searches only read from the collaborators. Ingestion and removal go
/// through the same collaborators and are not atomic with searches in
/// flight, so a query may observe a partially updated corpus.
pub struct HybridSearchEngine<TI, VI> where TI: TermIndex, VI: VectorIndex {
    text: TI,
    vector: VI,
    embedder: Box<dyn Embedder>,
    store: Box<dyn ChunkStore>,
    config: SearchConfig,
}

impl<TI, VI> HybridSearchEngine<TI, VI> where TI: TermIndex, VI: VectorIndex {
    pub fn new(text: TI, vector: VI, embedder: Box<dyn Embedder>) -> Self {
        Self {
            text,
            vector,
            embedder,
            store: Box::new(MemoryChunkStore::new()),
            config: SearchConfig::default(),
        }
    }

    pub fn with_store(mut self, store: Box<dyn ChunkStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_config(mut self, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    // ---- ingestion ----

    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub fn index(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        // 1) embed in one batch
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.embedder.dim()) {
            return Err(Error::Operation(format!(
                "embedder returned {} dimensions, expected {}",
                bad.len(),
                self.embedder.dim()
            )));
        }
        // 2) vector index, 3) term index, 4) chunk store
        self.vector.index(chunks, &embeddings)?;
        self.text.index(chunks)?;
        self.store.insert(chunks)?;
        info!(total = self.store.len(), "indexed chunks");
        Ok(())
    }

    /// Drop every chunk of `source` from all collaborators. Returns how many
    /// chunks the store held for it; unknown sources are `NotFound`.
    #[instrument(skip(self))]
    pub fn remove_source(&self, source: &str) -> Result<usize> {
        let vectors = self.vector.remove_source(source)?;
        let terms = self.text.remove_source(source)?;
        let removed = self.store.remove_source(source)?;
        if removed == 0 && vectors == 0 && terms == 0 {
            return Err(Error::NotFound(format!("source '{source}'")));
        }
        info!(removed, vectors, terms, "removed source");
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        self.vector.clear()?;
        self.text.clear()?;
        self.store.clear()?;
        info!("cleared all indexed chunks");
        Ok(())
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    pub fn sources(&self) -> Vec<String> {
        self.store.sources()
    }

    pub fn chunks_by_source(&self, source: &str) -> Vec<Chunk> {
        self.store.chunks_by_source(source)
    }

    // ---- search ----

    /// Top `top_k` chunks by cosine similarity to the query.
    #[instrument(skip(self))]
    pub fn semantic_search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        let Some(query) = self.prepare(query, top_k)? else { return Ok(Vec::new()) };
        Ok(self.semantic_candidates(query, top_k)?)
    }

    /// Top `top_k` chunks by BM25 score.
    #[instrument(skip(self))]
    pub fn keyword_search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        let Some(query) = self.prepare(query, top_k)? else { return Ok(Vec::new()) };
        Ok(self.keyword_candidates(query, top_k)?)
    }

    /// Fused chunk ranking. `semantic_weight` overrides the adaptive split.
    #[instrument(skip(self))]
    pub fn hybrid_search(&self, query: &str, top_k: usize, semantic_weight: Option<f32>) -> Result<Vec<FusedResult>> {
        let query = valid_query(query)?;
        let weights = resolve_weights(query, semantic_weight)?;
        if self.is_trivial(top_k) { return Ok(Vec::new()); }
        let mut fused = self.fused_candidates(query, self.oversampled(top_k), weights)?;
        fused.truncate(top_k);
        Ok(fused)
    }

    /// Chunk-level search in the shape returned to API callers.
    pub fn search(&self, req: &SearchRequest) -> Result<Vec<SearchResult>> {
        let top_k = self.top_k(req.top_k);
        let ranked = match req.mode {
            SearchMode::Semantic => single(self.semantic_search(&req.query, top_k)?),
            SearchMode::Keyword => single(self.keyword_search(&req.query, top_k)?),
            SearchMode::Hybrid => self.hybrid_search(&req.query, top_k, req.semantic_weight)?,
        };
        Ok(ranked.iter().map(SearchResult::from).collect())
    }

    /// Full per-file breakdown, best file first, truncated to the request's
    /// `top_k`.
    #[instrument(skip(self, req), fields(query = %req.query, mode = %req.mode))]
    pub fn search_file_aggregates(&self, req: &SearchRequest) -> Result<Vec<FileAggregate>> {
        let top_k = self.top_k(req.top_k);
        let query = valid_query(&req.query)?;
        // the override only applies to hybrid ranking, as in chunk-level search
        let weights = match req.mode {
            SearchMode::Hybrid => resolve_weights(query, req.semantic_weight)?,
            SearchMode::Semantic | SearchMode::Keyword => select_weights(query),
        };
        if self.is_trivial(top_k) { return Ok(Vec::new()); }

        // oversample so each file has enough chunks to judge breadth
        let n = self.oversampled(top_k);
        let mut files = match req.mode {
            SearchMode::Semantic => aggregate_by_file(&self.semantic_candidates(query, n)?, SearchType::Semantic),
            SearchMode::Keyword => aggregate_by_file(&self.keyword_candidates(query, n)?, SearchType::Keyword),
            SearchMode::Hybrid => aggregate_by_file(&self.fused_candidates(query, n, weights)?, SearchType::Hybrid),
        };
        files.truncate(top_k);
        Ok(files)
    }

    /// File-level search in the shape returned to API callers.
    pub fn search_files(&self, req: &SearchRequest) -> Result<Vec<FileSearchResult>> {
        Ok(self.search_file_aggregates(req)?.iter().map(FileSearchResult::from).collect())
    }

    // ---- internals ----

    /// Validate the query; `None` means the answer is trivially empty.
    fn prepare<'q>(&self, query: &'q str, top_k: usize) -> Result<Option<&'q str>> {
        let query = valid_query(query)?;
        Ok((!self.is_trivial(top_k)).then_some(query))
    }

    fn is_trivial(&self, top_k: usize) -> bool {
        if top_k == 0 {
            return true;
        }
        if self.store.is_empty() {
            debug!("no chunks indexed");
            return true;
        }
        false
    }

    fn top_k(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.default_top_k).min(self.config.max_top_k)
    }

    fn oversampled(&self, top_k: usize) -> usize {
        top_k.min(self.config.max_top_k).saturating_mul(self.config.oversample_factor)
    }

    fn semantic_candidates(&self, query: &str, k: usize) -> std::result::Result<Vec<ScoredChunk>, EmbeddingError> {
        let query_vec = self.embedder.embed(query)?;
        let neighbors = self
            .vector
            .nearest(&query_vec, k)
            .map_err(|e| EmbeddingError::new(format!("vector search failed: {e:#}")))?;
        Ok(self.resolve(neighbors.into_iter().map(|n| {
            let score = n.similarity();
            (n.id, score)
        }), SearchType::Semantic))
    }

    fn keyword_candidates(&self, query: &str, k: usize) -> anyhow::Result<Vec<ScoredChunk>> {
        let hits = self.text.term_score(query, k)?;
        Ok(self.resolve(hits.into_iter().map(|h| (h.id, h.score)), SearchType::Keyword))
    }

    /// Look hits up in the store. Ids the store no longer knows belong to a
    /// source removed mid-query and are dropped.
    fn resolve(&self, hits: impl Iterator<Item = (String, f32)>, search_type: SearchType) -> Vec<ScoredChunk> {
        hits.filter_map(|(id, score)| match self.store.get(&id) {
            Some(chunk) => Some(ScoredChunk::new(chunk, score, search_type)),
            None => {
                debug!(%id, %search_type, "dropping hit for unknown chunk");
                None
            }
        })
        .collect()
    }

    fn fused_candidates(&self, query: &str, n: usize, weights: Weights) -> Result<Vec<FusedResult>> {
        let semantic = self.semantic_candidates(query, n);
        let keyword = self.keyword_candidates(query, n);
        debug!(
            semantic = weights.semantic,
            keyword = weights.keyword,
            semantic_ok = semantic.is_ok(),
            keyword_ok = keyword.is_ok(),
            "retrieved candidates"
        );

        match (semantic, keyword) {
            (Ok(semantic), Ok(keyword)) => {
                Ok(fuse(&semantic, &keyword, weights, &FusionOptions::from(&self.config)))
            }
            (Err(sem_err), Err(kw_err)) => Err(Error::Retrieval {
                semantic: sem_err.to_string(),
                keyword: format!("{kw_err:#}"),
            }),
            (Err(sem_err), Ok(keyword)) => {
                if !self.config.keyword_fallback {
                    return Err(Error::Embedding(sem_err));
                }
                warn!(error = %sem_err, "semantic retrieval unavailable, serving keyword-only results");
                Ok(degraded(keyword))
            }
            (Ok(semantic), Err(kw_err)) => {
                warn!(error = %format!("{kw_err:#}"), "keyword retrieval failed, serving semantic-only results");
                Ok(degraded(semantic))
            }
        }
    }
}

fn valid_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::MalformedQuery("query is empty".into()));
    }
    Ok(query)
}

fn resolve_weights(query: &str, semantic_weight: Option<f32>) -> Result<Weights> {
    match semantic_weight {
        Some(w) if w.is_finite() && (0.0..=1.0).contains(&w) => Ok(Weights::from_semantic(w)),
        Some(w) => Err(Error::InvalidWeight(w)),
        None => Ok(select_weights(query)),
    }
}

fn single(results: Vec<ScoredChunk>) -> Vec<FusedResult> {
    results.into_iter().map(FusedResult::from_single).collect()
}

/// One surviving signal, normalized so scores stay in `[0, 1]` and tagged
/// with the signal that produced them.
fn degraded(mut results: Vec<ScoredChunk>) -> Vec<FusedResult> {
    normalize(&mut results);
    single(results)
}
