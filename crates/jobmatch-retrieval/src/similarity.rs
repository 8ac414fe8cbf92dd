//! Pairwise similarity between retrieved candidates.
//!
//! Used by the deduplicator to decide whether two postings are the same job.
//! Every measure returns a value in `[0, 1]`, 1 meaning identical.

use std::collections::HashSet;

use jobmatch_embeddings::Embedding;
use jobmatch_types::{normalize_whitespace, MatchResult, MatchingSettings, SimilarityKind};

/// A retrieved document together with its pool embedding.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub result: MatchResult,
    pub embedding: Option<Embedding>,
}

impl Candidate {
    pub fn new(result: MatchResult, embedding: Option<Embedding>) -> Self {
        Self { result, embedding }
    }

    pub fn text(&self) -> &str {
        &self.result.document.text
    }

    pub fn id(&self) -> &str {
        &self.result.document.id
    }
}

/// Pairwise similarity measure on a `[0, 1]` scale.
pub trait TextSimilarity: Send + Sync {
    fn name(&self) -> &'static str;

    fn similarity(&self, a: &Candidate, b: &Candidate) -> f32;
}

/// 1.0 when the whitespace-normalized texts are equal, 0.0 otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactTextSimilarity;

impl TextSimilarity for ExactTextSimilarity {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn similarity(&self, a: &Candidate, b: &Candidate) -> f32 {
        if normalize_whitespace(a.text()) == normalize_whitespace(b.text()) {
            1.0
        } else {
            0.0
        }
    }
}

/// Cosine similarity of the candidates' embeddings, clamped to `[0, 1]`.
///
/// Zero-signal embeddings (empty or unembeddable text) say nothing about
/// duplication, so those pairs fall back to exact text comparison.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingSimilarity {
    pub degenerate_norm: f32,
}

impl Default for EmbeddingSimilarity {
    fn default() -> Self {
        Self {
            degenerate_norm: 1e-6,
        }
    }
}

impl TextSimilarity for EmbeddingSimilarity {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn similarity(&self, a: &Candidate, b: &Candidate) -> f32 {
        match (&a.embedding, &b.embedding) {
            (Some(ea), Some(eb))
                if !ea.is_degenerate(self.degenerate_norm)
                    && !eb.is_degenerate(self.degenerate_norm) =>
            {
                ea.cosine_similarity(eb).clamp(0.0, 1.0)
            }
            _ => ExactTextSimilarity.similarity(a, b),
        }
    }
}

/// Jaccard overlap of lowercased word n-grams.
///
/// Catches templated postings that share most of their boilerplate even when
/// a model embeds them slightly apart.
#[derive(Debug, Clone, Copy)]
pub struct ShingleSimilarity {
    pub size: usize,
}

impl Default for ShingleSimilarity {
    fn default() -> Self {
        Self { size: 3 }
    }
}

impl ShingleSimilarity {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    fn shingles(&self, text: &str) -> HashSet<String> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        if words.len() <= self.size {
            // Short texts become a single shingle
            return std::iter::once(words.join(" "))
                .filter(|s| !s.is_empty())
                .collect();
        }

        words
            .windows(self.size)
            .map(|window| window.join(" "))
            .collect()
    }
}

impl TextSimilarity for ShingleSimilarity {
    fn name(&self) -> &'static str {
        "shingle"
    }

    fn similarity(&self, a: &Candidate, b: &Candidate) -> f32 {
        let sa = self.shingles(a.text());
        let sb = self.shingles(b.text());

        if sa.is_empty() && sb.is_empty() {
            return 1.0;
        }

        let intersection = sa.intersection(&sb).count();
        let union = sa.len() + sb.len() - intersection;
        intersection as f32 / union as f32
    }
}

/// Build the similarity measure selected in settings.
pub fn similarity_from_settings(settings: &MatchingSettings) -> Box<dyn TextSimilarity> {
    match settings.similarity {
        SimilarityKind::Embedding => Box::new(EmbeddingSimilarity {
            degenerate_norm: settings.degenerate_norm,
        }),
        SimilarityKind::Shingle => Box::new(ShingleSimilarity::new(settings.shingle_size)),
        SimilarityKind::Exact => Box::new(ExactTextSimilarity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobmatch_types::Document;

    fn candidate(text: &str, embedding: Option<Vec<f32>>) -> Candidate {
        Candidate::new(
            MatchResult::new(Document::new("id", "", text), 0, 0.0),
            embedding.map(Embedding::new),
        )
    }

    #[test]
    fn test_exact_ignores_whitespace() {
        let a = candidate("Data  Scientist\n", None);
        let b = candidate("Data Scientist", None);
        let c = candidate("data scientist", None);
        assert_eq!(ExactTextSimilarity.similarity(&a, &b), 1.0);
        assert_eq!(ExactTextSimilarity.similarity(&a, &c), 0.0);
    }

    #[test]
    fn test_embedding_similarity_clamped() {
        let sim = EmbeddingSimilarity::default();
        let a = candidate("a", Some(vec![1.0, 0.0]));
        let b = candidate("b", Some(vec![-1.0, 0.0]));
        let c = candidate("c", Some(vec![1.0, 0.0]));
        assert_eq!(sim.similarity(&a, &b), 0.0);
        assert!((sim.similarity(&a, &c) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_embedding_similarity_falls_back_on_zero_vectors() {
        let sim = EmbeddingSimilarity::default();
        let a = candidate("", Some(vec![0.0, 0.0]));
        let b = candidate("", Some(vec![0.0, 0.0]));
        let c = candidate("text", None);
        assert_eq!(sim.similarity(&a, &b), 1.0);
        assert_eq!(sim.similarity(&a, &c), 0.0);
    }

    #[test]
    fn test_shingle_identical_and_disjoint() {
        let sim = ShingleSimilarity::new(2);
        let a = candidate("open emergency exits and close aircraft doors", None);
        let b = candidate("Open emergency exits, and close aircraft doors!", None);
        let c = candidate("manage marina maintenance records", None);
        assert!((sim.similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert_eq!(sim.similarity(&a, &c), 0.0);
    }

    #[test]
    fn test_shingle_partial_overlap() {
        let sim = ShingleSimilarity::new(1);
        let a = candidate("python sql spark", None);
        let b = candidate("python sql excel", None);
        // {python, sql} / {python, sql, spark, excel}
        assert!((sim.similarity(&a, &b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_shingle_short_and_empty_texts() {
        let sim = ShingleSimilarity::new(3);
        assert_eq!(
            sim.similarity(&candidate("", None), &candidate("  ", None)),
            1.0
        );
        assert_eq!(
            sim.similarity(&candidate("rust", None), &candidate("", None)),
            0.0
        );
        assert_eq!(
            sim.similarity(&candidate("Rust dev", None), &candidate("rust DEV", None)),
            1.0
        );
    }

    #[test]
    fn test_similarity_from_settings() {
        let mut settings = MatchingSettings::default();
        assert_eq!(similarity_from_settings(&settings).name(), "embedding");
        settings.similarity = SimilarityKind::Shingle;
        assert_eq!(similarity_from_settings(&settings).name(), "shingle");
        settings.similarity = SimilarityKind::Exact;
        assert_eq!(similarity_from_settings(&settings).name(), "exact");
    }
}
