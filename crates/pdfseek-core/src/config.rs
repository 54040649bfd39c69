//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys split on `__`, e.g. `APP_SEARCH__OVERSAMPLE_FACTOR`).
//! `Config::search` extracts the typed `[search]` section.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Load a single TOML file without environment layering.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let config = Self { figment: Figment::new().merge(Toml::file(path)) };
        config.search()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The `[search]` section, or defaults when it is absent.
    pub fn search(&self) -> Result<SearchConfig> {
        if !self.figment.contains("search") {
            return Ok(SearchConfig::default());
        }
        let search: SearchConfig = self
            .figment
            .extract_inner("search")
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        search.validate()?;
        Ok(search)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let search = self.search()?;
        match env {
            "prod" | "production" if !search.keyword_fallback => {
                tracing::warn!("keyword fallback disabled: embedding outages will fail searches");
            }
            _ => {}
        }
        Ok(())
    }
}

/// How fused candidates from the two signals are matched up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// `source + page + first N chars of content`.
    #[default]
    ContentPrefix,
    /// Chunk identifier carried through both retrieval paths.
    ChunkId,
}

/// Tunables for the hybrid retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Candidates requested per signal = `top_k * oversample_factor`.
    pub oversample_factor: usize,
    pub co_occurrence_bonus: f32,
    pub merge_key_prefix_chars: usize,
    pub merge_strategy: MergeStrategy,
    /// Serve keyword-only results when the embedding side fails.
    pub keyword_fallback: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 1000,
            oversample_factor: 3,
            co_occurrence_bonus: 1.1,
            merge_key_prefix_chars: 50,
            merge_strategy: MergeStrategy::ContentPrefix,
            keyword_fallback: true,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.oversample_factor == 0 {
            return Err(Error::InvalidConfig("oversample_factor must be >= 1".into()));
        }
        if !self.co_occurrence_bonus.is_finite() || self.co_occurrence_bonus < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "co_occurrence_bonus must be >= 1.0, got {}",
                self.co_occurrence_bonus
            )));
        }
        if self.merge_key_prefix_chars == 0 {
            return Err(Error::InvalidConfig("merge_key_prefix_chars must be >= 1".into()));
        }
        if self.max_top_k == 0 || self.default_top_k > self.max_top_k {
            return Err(Error::InvalidConfig(format!(
                "default_top_k ({}) must be within 1..=max_top_k ({})",
                self.default_top_k, self.max_top_k
            )));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
