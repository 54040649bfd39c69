//! pdfseek-text
//!
//! Tantivy-based BM25 term index serving the keyword signal of hybrid search.

pub mod tantivy_utils;
pub mod index;

pub use index::TantivyIndexer;
