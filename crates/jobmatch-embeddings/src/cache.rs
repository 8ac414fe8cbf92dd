//! On-disk model file cache.
//!
//! The first Candle run pulls the model from HuggingFace Hub into
//! `<cache_dir>/<org>_<name>/`; later runs load from there and work offline.
//! Only files that are missing are fetched, so an interrupted download
//! resumes where it stopped.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::EmbeddingError;

/// Sentence-transformers model used unless configured otherwise.
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Hub revision the model files are fetched from
pub const MODEL_REVISION: &str = "main";

/// File in the model dir holding the commit the files were fetched at.
const REVISION_FILE: &str = "revision";

/// A file the Candle embedder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFile {
    Config,
    Tokenizer,
    Weights,
}

impl ModelFile {
    pub const ALL: [ModelFile; 3] = [ModelFile::Config, ModelFile::Tokenizer, ModelFile::Weights];

    /// File name inside the Hub repository.
    pub fn file_name(self) -> &'static str {
        match self {
            ModelFile::Config => "config.json",
            ModelFile::Tokenizer => "tokenizer.json",
            ModelFile::Weights => "model.safetensors",
        }
    }
}

impl fmt::Display for ModelFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Where one model's files live locally.
#[derive(Debug, Clone)]
pub struct ModelCache {
    pub cache_dir: PathBuf,
    /// HuggingFace repository, `org/name`
    pub repo_id: String,
}

impl Default for ModelCache {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("jobmatch")
            .join("models");
        Self::new(cache_dir, DEFAULT_MODEL_REPO)
    }
}

impl ModelCache {
    pub fn new(cache_dir: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            repo_id: repo_id.into(),
        }
    }

    /// Short model name, the last segment of the repository id.
    pub fn model_name(&self) -> &str {
        self.repo_id.rsplit('/').next().unwrap_or(&self.repo_id)
    }

    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.repo_id.replace('/', "_"))
    }

    pub fn path_of(&self, file: ModelFile) -> PathBuf {
        self.model_dir().join(file.file_name())
    }

    /// Required files not yet on disk, in [`ModelFile::ALL`] order.
    pub fn missing(&self) -> Vec<ModelFile> {
        ModelFile::ALL
            .into_iter()
            .filter(|&file| !self.path_of(file).exists())
            .collect()
    }

    /// Commit sha recorded by the last download, if any.
    pub fn resolved_revision(&self) -> Option<String> {
        let text = std::fs::read_to_string(self.model_dir().join(REVISION_FILE)).ok()?;
        let sha = text.trim();
        (!sha.is_empty()).then(|| sha.to_string())
    }

    pub fn is_cached(&self) -> bool {
        self.missing().is_empty()
    }

    /// Snapshot for `model status` style reporting.
    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            repo_id: self.repo_id.clone(),
            model_dir: self.model_dir(),
            missing: self.missing(),
        }
    }
}

/// What is and is not present in a [`ModelCache`].
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub repo_id: String,
    pub model_dir: PathBuf,
    pub missing: Vec<ModelFile>,
}

impl CacheStatus {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Local paths of a complete model.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
    /// Hub commit the files came from, or [`MODEL_REVISION`] when unknown
    pub revision: String,
}

impl ModelPaths {
    fn in_cache(cache: &ModelCache) -> Self {
        Self {
            config: cache.path_of(ModelFile::Config),
            tokenizer: cache.path_of(ModelFile::Tokenizer),
            weights: cache.path_of(ModelFile::Weights),
            revision: cache
                .resolved_revision()
                .unwrap_or_else(|| MODEL_REVISION.to_string()),
        }
    }
}

/// Return the cached model, fetching whatever is missing first.
pub fn get_or_download_model(cache: &ModelCache) -> Result<ModelPaths, EmbeddingError> {
    let missing = cache.missing();
    if missing.is_empty() {
        debug!(path = ?cache.model_dir(), "Using cached model");
    } else {
        info!(repo = %cache.repo_id, files = missing.len(), "Downloading model files");
        fetch(cache, &missing)?;
    }
    Ok(ModelPaths::in_cache(cache))
}

fn fetch(cache: &ModelCache, files: &[ModelFile]) -> Result<(), EmbeddingError> {
    use hf_hub::api::sync::Api;
    use hf_hub::{Repo, RepoType};

    let download_error = |file: ModelFile, reason: String| EmbeddingError::Download {
        repo: cache.repo_id.clone(),
        file: file.to_string(),
        reason,
    };

    let api = Api::new().map_err(|e| download_error(ModelFile::Config, e.to_string()))?;
    let repo = api.repo(Repo::with_revision(
        cache.repo_id.clone(),
        RepoType::Model,
        MODEL_REVISION.to_string(),
    ));

    std::fs::create_dir_all(cache.model_dir())?;

    for &file in files {
        info!(%file, "Fetching");
        let hub_path = repo
            .get(file.file_name())
            .map_err(|e| download_error(file, e.to_string()))?;

        // hf-hub keeps its own blob store; copy so the cache dir is self-contained
        let dest = cache.path_of(file);
        std::fs::copy(&hub_path, &dest)?;
        debug!(%file, dest = ?dest, "Stored model file");
    }

    // A branch name moves; pin what was actually fetched
    match repo.info() {
        Ok(info) => {
            std::fs::write(cache.model_dir().join(REVISION_FILE), &info.sha)?;
            info!(sha = %info.sha, "Recorded model revision");
        }
        Err(e) => warn!(error = %e, "Could not resolve model revision"),
    }

    Ok(())
}
