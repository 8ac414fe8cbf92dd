//! Command implementations for the jobmatch binary.
//!
//! Handles:
//! - match: load inputs, run the pipeline, print the report
//! - compare: print reference-to-document similarities in pool order
//! - model: inspect or fill the model cache
//! - config: print effective settings

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use jobmatch_embeddings::{
    get_or_download_model, CandleEmbedder, EmbeddingModel, HashingEmbedder, ModelCache,
};
use jobmatch_retrieval::{DocumentScore, MatchPipeline, Retriever};
use jobmatch_types::{CandidatePool, EmbedderKind, MatchReport, Settings};

use crate::cli::{BackendArgs, EmbedderArg, OutputFormat};

/// Separator between postings in the text digest.
pub const DIVIDER_WIDTH: usize = 79;

/// Load layered settings and apply CLI overrides (highest precedence).
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Apply `--embedder` / `--index` overrides.
pub fn apply_backend_overrides(settings: &mut Settings, backends: &BackendArgs) {
    if let Some(embedder) = backends.embedder {
        settings.embedding.backend = embedder.into();
    }
    if let Some(index) = backends.index {
        settings.index.backend = index.into();
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so stdout
/// carries only command output.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn model_cache(settings: &Settings) -> ModelCache {
    ModelCache::new(settings.expanded_cache_dir(), &settings.embedding.model_repo)
}

/// Build the configured embedder. Model loading runs on the blocking pool.
pub async fn build_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingModel>> {
    match settings.embedding.backend {
        EmbedderKind::Hashing => {
            let embedder = HashingEmbedder::new(settings.embedding.dimension)
                .context("Invalid hashing embedder dimension")?;
            Ok(Arc::new(embedder))
        }
        EmbedderKind::Candle => {
            let cache = model_cache(settings);
            let embedder = tokio::task::spawn_blocking(move || CandleEmbedder::load(&cache))
                .await
                .context("Model loading task panicked")?
                .context("Failed to load embedding model")?;
            Ok(Arc::new(embedder))
        }
    }
}

/// Read the reference text and candidate pool from disk.
pub async fn load_inputs(reference: &Path, pool_path: &Path) -> Result<(String, CandidatePool)> {
    let reference_text = tokio::fs::read_to_string(reference)
        .await
        .with_context(|| format!("Failed to read reference {}", reference.display()))?;
    let pool_text = tokio::fs::read_to_string(pool_path)
        .await
        .with_context(|| format!("Failed to read pool {}", pool_path.display()))?;
    let pool = CandidatePool::from_json_str(&pool_text)
        .with_context(|| format!("Invalid candidate pool {}", pool_path.display()))?;

    info!(
        reference_chars = reference_text.len(),
        pool = pool.len(),
        "Loaded inputs"
    );
    Ok((reference_text.trim().to_string(), pool))
}

/// Run a full matching session over files on disk.
pub async fn match_files(
    settings: &Settings,
    reference: &Path,
    pool: &Path,
    count: Option<usize>,
) -> Result<MatchReport> {
    let (reference_text, pool) = load_inputs(reference, pool).await?;
    let embedder = build_embedder(settings).await?;
    let pipeline = MatchPipeline::from_settings(embedder, settings)
        .context("Invalid matching configuration")?;
    let count = count.unwrap_or(settings.matching.requested_count);

    let report = tokio::task::spawn_blocking(move || pipeline.run(&reference_text, &pool, count))
        .await
        .context("Matching task panicked")?
        .context("Matching failed")?;

    if report.low_confidence {
        warn!("Reference carried almost no signal; treat the ranking with caution");
    }
    Ok(report)
}

/// Score the reference against every pool document, in pool order.
pub async fn compare_files(
    settings: &Settings,
    reference: &Path,
    pool: &Path,
) -> Result<Vec<DocumentScore>> {
    let (reference_text, pool) = load_inputs(reference, pool).await?;
    let embedder = build_embedder(settings).await?;
    let retriever = Retriever::new(embedder);

    tokio::task::spawn_blocking(move || retriever.score_all(&reference_text, &pool))
        .await
        .context("Scoring task panicked")?
        .context("Scoring failed")
}

/// Plain-text digest: one block per posting, separated by a dashed rule.
pub fn render_text(report: &MatchReport) -> String {
    if report.is_empty() {
        return format!(
            "No matches found ({} postings searched).\n",
            report.pool_size
        );
    }

    let divider = format!("\n{}\n", "-".repeat(DIVIDER_WIDTH));
    let blocks: Vec<String> = report
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let title = if r.document.title.is_empty() {
                "(untitled)"
            } else {
                r.document.title.as_str()
            };
            format!(
                "{}. {} [distance {:.4}]\n{}\n\n{}\n",
                i + 1,
                title,
                r.distance,
                r.document.id,
                r.document.text.trim()
            )
        })
        .collect();

    let mut out = format!(
        "{} of {} requested matches ({} postings, {} duplicates removed, {} skipped)\n\n",
        report.len(),
        report.requested,
        report.pool_size,
        report.duplicates_removed,
        report.skipped
    );
    out.push_str(&blocks.join(divider.as_str()));
    out
}

pub fn render_json(report: &MatchReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

/// Tab-separated similarity listing.
pub fn render_scores_text(scores: &[DocumentScore]) -> String {
    let mut out = String::from("similarity\tdistance\tid\ttitle\n");
    for s in scores {
        out.push_str(&format!(
            "{:.4}\t{:.4}\t{}\t{}\n",
            s.similarity, s.distance, s.id, s.title
        ));
    }
    out
}

pub fn render_scores_json(scores: &[DocumentScore]) -> Result<String> {
    let rows: Vec<serde_json::Value> = scores
        .iter()
        .map(|s| {
            serde_json::json!({
                "id": s.id,
                "title": s.title,
                "similarity": s.similarity,
                "distance": s.distance,
            })
        })
        .collect();
    serde_json::to_string_pretty(&rows).context("Failed to serialize scores")
}

/// Handle `jobmatch match`.
pub async fn handle_match(
    mut settings: Settings,
    reference: &Path,
    pool: &Path,
    count: Option<usize>,
    format: OutputFormat,
    backends: &BackendArgs,
) -> Result<()> {
    apply_backend_overrides(&mut settings, backends);
    let report = match_files(&settings, reference, pool, count).await?;
    let output = match format {
        OutputFormat::Text => render_text(&report),
        OutputFormat::Json => render_json(&report)?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

/// Handle `jobmatch compare`.
pub async fn handle_compare(
    mut settings: Settings,
    reference: &Path,
    pool: &Path,
    format: OutputFormat,
    embedder: Option<EmbedderArg>,
) -> Result<()> {
    if let Some(embedder) = embedder {
        settings.embedding.backend = embedder.into();
    }
    let scores = compare_files(&settings, reference, pool).await?;
    let output = match format {
        OutputFormat::Text => render_scores_text(&scores),
        OutputFormat::Json => render_scores_json(&scores)?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

/// Handle `jobmatch model status`.
pub fn show_model_status(settings: &Settings) -> Result<()> {
    let cache = model_cache(settings);
    let status = cache.status();
    println!("Model:     {}", status.repo_id);
    println!("Cache dir: {}", status.model_dir.display());
    if let Some(sha) = cache.resolved_revision() {
        println!("Revision:  {sha}");
    }

    if status.is_complete() {
        println!("Status:    cached");
    } else {
        let missing: Vec<String> = status.missing.iter().map(|f| f.to_string()).collect();
        println!("Status:    missing {}", missing.join(", "));
    }
    Ok(())
}

/// Handle `jobmatch model download`.
pub async fn download_model(settings: &Settings) -> Result<()> {
    let cache = model_cache(settings);
    let paths = tokio::task::spawn_blocking(move || get_or_download_model(&cache))
        .await
        .context("Download task panicked")?
        .context("Failed to download model")?;
    println!("Model ready: {}", paths.weights.display());
    Ok(())
}

/// Handle `jobmatch config show`.
pub fn show_config(settings: &Settings) -> Result<()> {
    let rendered = toml::to_string_pretty(settings).context("Failed to render settings")?;
    println!("{}", rendered.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::IndexArg;
    use jobmatch_types::{Document, IndexKind, MatchResult};

    fn report() -> MatchReport {
        let mut report = MatchReport::empty("hashing@fnv1a-v1", 3);
        report.pool_size = 4;
        report.duplicates_removed = 1;
        report.results = vec![
            MatchResult::new(
                Document::new("https://jobs/1", "Data Scientist", "  Python and SQL.\n"),
                0,
                0.25,
            ),
            MatchResult::new(Document::new("https://jobs/2", "", "Spark."), 1, 0.5),
        ];
        report
    }

    #[test]
    fn test_render_text_uses_divider() {
        let text = render_text(&report());
        let divider = "-".repeat(79);
        assert_eq!(text.matches(&divider).count(), 1);
        assert!(text.starts_with("2 of 3 requested matches"));
        assert!(text.contains("1. Data Scientist [distance 0.2500]\nhttps://jobs/1\n\nPython and SQL.\n"));
        assert!(text.contains("2. (untitled)"));
    }

    #[test]
    fn test_render_text_empty() {
        let report = MatchReport::empty("m", 5);
        assert_eq!(render_text(&report), "No matches found (0 postings searched).\n");
    }

    #[test]
    fn test_render_json_roundtrips_ids() {
        let json = render_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"][1]["document"]["id"], "https://jobs/2");
        assert_eq!(value["duplicates_removed"], 1);
    }

    #[test]
    fn test_render_scores() {
        let scores = vec![DocumentScore {
            id: "a".to_string(),
            title: "A".to_string(),
            similarity: 0.5,
            distance: 1.0,
        }];
        assert_eq!(
            render_scores_text(&scores),
            "similarity\tdistance\tid\ttitle\n0.5000\t1.0000\ta\tA\n"
        );
        let value: serde_json::Value =
            serde_json::from_str(&render_scores_json(&scores).unwrap()).unwrap();
        assert_eq!(value[0]["id"], "a");
    }

    #[test]
    fn test_backend_overrides() {
        let mut settings = Settings::default();
        apply_backend_overrides(
            &mut settings,
            &BackendArgs {
                embedder: Some(EmbedderArg::Hashing),
                index: Some(IndexArg::Hnsw),
            },
        );
        assert_eq!(settings.embedding.backend, EmbedderKind::Hashing);
        assert_eq!(settings.index.backend, IndexKind::Hnsw);

        // No flags leaves settings alone
        apply_backend_overrides(&mut settings, &BackendArgs::default());
        assert_eq!(settings.index.backend, IndexKind::Hnsw);
    }
}
