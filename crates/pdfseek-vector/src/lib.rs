//! pdfseek-vector
//!
//! Brute-force cosine nearest-neighbour index held in memory. Serves as the
//! reference `VectorIndex` collaborator for the hybrid engine.

pub mod memory;

pub use memory::{cosine_similarity, MemoryVectorIndex};
