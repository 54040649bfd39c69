//! Query-shape driven split between the semantic and keyword signals.
//!
//! Short, quoted, or numeric queries are usually literal lookups and lean on
//! exact term matching; longer natural-language queries lean on meaning.

use serde::{Deserialize, Serialize};

pub const LITERAL_SEMANTIC_WEIGHT: f32 = 0.4;
pub const MEDIUM_SEMANTIC_WEIGHT: f32 = 0.6;
pub const LONG_SEMANTIC_WEIGHT: f32 = 0.75;

const QUOTE_CHARS: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub semantic: f32,
    pub keyword: f32,
}

impl Weights {
    /// `keyword = 1 - semantic`.
    pub fn from_semantic(semantic: f32) -> Self {
        Self { semantic, keyword: 1.0 - semantic }
    }
}

/// Pick the weight split from surface features of `query`.
pub fn select_weights(query: &str) -> Weights {
    let token_count = query.split_whitespace().count();
    let has_digit = query.chars().any(char::is_numeric);
    let has_quote = query.contains(QUOTE_CHARS);

    let semantic = if token_count <= 2 || has_digit || has_quote {
        LITERAL_SEMANTIC_WEIGHT
    } else if token_count <= 4 {
        MEDIUM_SEMANTIC_WEIGHT
    } else {
        LONG_SEMANTIC_WEIGHT
    };
    Weights::from_semantic(semantic)
}
