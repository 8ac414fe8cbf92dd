//! Near-duplicate filtering.
//!
//! Scraped job boards re-post the same job under several URLs and reuse
//! templated descriptions. Candidates are offered in rank order to a
//! [`DedupAccumulator`]; one is kept only if it is less similar than the
//! threshold to every candidate kept before it, so the nearest member of
//! each duplicate cluster survives.
//!
//! Each offer compares against every accepted item: O(n·m) similarity calls
//! for n candidates and m accepted. Fine for pools of a few hundred postings;
//! larger pools want a blocking step (e.g. MinHash buckets) first.

use tracing::debug;

use jobmatch_types::FinalSet;

use crate::similarity::{Candidate, TextSimilarity};

/// Default similarity at which two postings count as the same job.
pub const DEFAULT_DUPLICATE_THRESHOLD: f32 = 0.99;

/// Outcome of offering one candidate to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DedupDecision {
    /// Kept; distinct from everything accepted so far
    Accepted,
    /// Dropped as a near-duplicate of the accepted item at `of`
    Duplicate { of: usize, similarity: f32 },
    /// Dropped because the target size was already reached
    Full,
}

/// Greedy accumulator of mutually distinct candidates.
pub struct DedupAccumulator<'a> {
    similarity: &'a dyn TextSimilarity,
    threshold: f32,
    target: usize,
    accepted: Vec<Candidate>,
    duplicates: usize,
}

impl<'a> DedupAccumulator<'a> {
    pub fn new(similarity: &'a dyn TextSimilarity, threshold: f32, target: usize) -> Self {
        Self {
            similarity,
            threshold,
            target,
            accepted: Vec::with_capacity(target.min(64)),
            duplicates: 0,
        }
    }

    /// Decide on the next candidate in rank order.
    pub fn offer(&mut self, candidate: Candidate) -> DedupDecision {
        if self.is_full() {
            return DedupDecision::Full;
        }

        // Report the closest accepted match, not just the first over threshold
        let closest = self
            .accepted
            .iter()
            .enumerate()
            .map(|(i, kept)| (i, self.similarity.similarity(kept, &candidate)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((of, similarity)) = closest {
            if similarity >= self.threshold {
                debug!(
                    id = %candidate.id(),
                    duplicate_of = %self.accepted[of].id(),
                    similarity,
                    "Dropped near-duplicate"
                );
                self.duplicates += 1;
                return DedupDecision::Duplicate { of, similarity };
            }
        }

        self.accepted.push(candidate);
        DedupDecision::Accepted
    }

    pub fn is_full(&self) -> bool {
        self.accepted.len() >= self.target
    }

    pub fn accepted(&self) -> &[Candidate] {
        &self.accepted
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Candidates dropped as near-duplicates so far
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn into_final_set(self) -> FinalSet {
        self.accepted.into_iter().map(|c| c.result).collect()
    }
}

/// Result of a dedup pass.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub results: FinalSet,
    pub duplicates_removed: usize,
}

/// Filters a ranked candidate list down to mutually distinct results.
pub struct Deduplicator {
    similarity: Box<dyn TextSimilarity>,
    threshold: f32,
}

impl Deduplicator {
    pub fn new(similarity: Box<dyn TextSimilarity>, threshold: f32) -> Self {
        Self {
            similarity,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn similarity(&self) -> &dyn TextSimilarity {
        self.similarity.as_ref()
    }

    /// Keep at most `target` candidates, nearest first, none of them
    /// near-duplicates of each other. `ranked` must be nearest-first.
    pub fn filter(&self, ranked: Vec<Candidate>, target: usize) -> DedupOutcome {
        let mut acc = DedupAccumulator::new(self.similarity.as_ref(), self.threshold, target);

        for candidate in ranked {
            if acc.offer(candidate) == DedupDecision::Full {
                break;
            }
        }

        debug!(
            kept = acc.len(),
            duplicates = acc.duplicates(),
            target,
            "Dedup complete"
        );

        let duplicates_removed = acc.duplicates();
        DedupOutcome {
            results: acc.into_final_set(),
            duplicates_removed,
        }
    }
}
