//! Hybrid retrieval and ranking.
//!
//! Two independent relevance signals (dense embedding similarity and sparse
//! BM25 term scores) are normalized per list, weighted by query shape, fused,
//! and optionally rolled up into per-file rankings.
//!
//! - [`normalize`]: min-max rescaling of one signal
//! - [`weights`]: adaptive semantic/keyword split
//! - [`fusion`]: weighted merge with co-occurrence bonus
//! - [`aggregate`]: file-level composite scoring
//! - [`engine`]: [`HybridSearchEngine`] sequencing all of the above

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod aggregate;
pub mod engine;
pub mod fusion;
pub mod normalize;
pub mod weights;

pub use aggregate::aggregate_by_file;
pub use engine::{HybridSearchEngine, SearchMode, SearchRequest};
pub use fusion::{fuse, FusionOptions};
pub use normalize::min_max;
pub use weights::{select_weights, Weights};
