//! Configuration loading for jobmatch.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/jobmatch/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::MatchError;

/// How pairwise similarity between two candidates is measured during dedup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    /// Cosine similarity of the document embeddings
    #[default]
    Embedding,
    /// Jaccard overlap of word shingles
    Shingle,
    /// Whitespace-normalized exact text equality
    Exact,
}

/// Which embedding backend produces vectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// all-MiniLM-L6-v2 through candle
    #[default]
    Candle,
    /// Feature-hashing embedder, no model files required
    Hashing,
}

/// Which nearest-neighbor index answers queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Exact brute-force scan
    #[default]
    Flat,
    /// usearch HNSW graph (approximate)
    Hnsw,
}

/// Retrieval and deduplication knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingSettings {
    /// Number of results returned when the caller does not say
    #[serde(default = "default_requested_count")]
    pub requested_count: usize,

    /// Retrieve this many times the requested count before dedup.
    #[serde(default = "default_buffer_multiplier")]
    pub buffer_multiplier: usize,

    /// Candidates at or above this similarity to an accepted result are dropped.
    /// Range: 0.0-1.0, lower = more aggressive dedup.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f32,

    /// Neighbors closer than this are discarded as noise (0.0 disables).
    #[serde(default)]
    pub min_distance: f32,

    /// Reference embeddings with a smaller L2 norm are flagged low-confidence.
    #[serde(default = "default_degenerate_norm")]
    pub degenerate_norm: f32,

    #[serde(default)]
    pub similarity: SimilarityKind,

    /// Words per shingle for `SimilarityKind::Shingle`
    #[serde(default = "default_shingle_size")]
    pub shingle_size: usize,
}

fn default_requested_count() -> usize {
    10
}

fn default_buffer_multiplier() -> usize {
    2
}

fn default_duplicate_threshold() -> f32 {
    0.99
}

fn default_degenerate_norm() -> f32 {
    1e-6
}

fn default_shingle_size() -> usize {
    3
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            requested_count: default_requested_count(),
            buffer_multiplier: default_buffer_multiplier(),
            duplicate_threshold: default_duplicate_threshold(),
            min_distance: 0.0,
            degenerate_norm: default_degenerate_norm(),
            similarity: SimilarityKind::default(),
            shingle_size: default_shingle_size(),
        }
    }
}

impl MatchingSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.duplicate_threshold) {
            return Err(format!(
                "duplicate_threshold must be 0.0-1.0, got {}",
                self.duplicate_threshold
            ));
        }
        if self.buffer_multiplier == 0 {
            return Err("buffer_multiplier must be > 0".to_string());
        }
        if !(self.min_distance >= 0.0) {
            return Err(format!(
                "min_distance must be >= 0.0, got {}",
                self.min_distance
            ));
        }
        if !(self.degenerate_norm >= 0.0) {
            return Err(format!(
                "degenerate_norm must be >= 0.0, got {}",
                self.degenerate_norm
            ));
        }
        if self.shingle_size == 0 {
            return Err("shingle_size must be > 0".to_string());
        }
        Ok(())
    }
}

/// Embedding model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub backend: EmbedderKind,

    /// HuggingFace repository for the candle backend
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Directory holding downloaded model files
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: String,

    /// Output dimension of the hashing backend
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Number of document embeddings kept between runs (0 disables)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_model_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_model_cache_dir() -> String {
    ProjectDirs::from("", "", "jobmatch")
        .map(|p| p.cache_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from(".cache/jobmatch/models"))
        .to_string_lossy()
        .to_string()
}

fn default_dimension() -> usize {
    384
}

fn default_cache_capacity() -> usize {
    4096
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbedderKind::default(),
            model_repo: default_model_repo(),
            cache_dir: default_model_cache_dir(),
            dimension: default_dimension(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Vector index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default)]
    pub backend: IndexKind,

    /// HNSW connections per layer (M)
    #[serde(default = "default_connectivity")]
    pub connectivity: usize,

    /// HNSW build-time search depth (ef_construction)
    #[serde(default = "default_expansion_add")]
    pub expansion_add: usize,

    /// HNSW query-time search depth (ef_search)
    #[serde(default = "default_expansion_search")]
    pub expansion_search: usize,
}

fn default_connectivity() -> usize {
    16
}

fn default_expansion_add() -> usize {
    200
}

fn default_expansion_search() -> usize {
    100
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: IndexKind::default(),
            connectivity: default_connectivity(),
            expansion_add: default_expansion_add(),
            expansion_search: default_expansion_search(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub matching: MatchingSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub index: IndexSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            matching: MatchingSettings::default(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/jobmatch/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (JOBMATCH_*, nested keys split on `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, MatchError> {
        let config_dir = ProjectDirs::from("", "", "jobmatch")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| MatchError::Config(e.to_string()))?
            .set_default("embedding.model_repo", default_model_repo())
            .map_err(|e| MatchError::Config(e.to_string()))?
            .set_default("embedding.cache_dir", default_model_cache_dir())
            .map_err(|e| MatchError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: JOBMATCH_LOG_LEVEL, JOBMATCH_MATCHING__DUPLICATE_THRESHOLD, ...
        builder = builder.add_source(
            Environment::with_prefix("JOBMATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| MatchError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| MatchError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), MatchError> {
        self.matching.validate().map_err(MatchError::Config)
    }

    /// Expand ~ in the model cache path to the home directory
    pub fn expanded_cache_dir(&self) -> PathBuf {
        if let Some(rest) = self.embedding.cache_dir.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.embedding.cache_dir)
    }
}
