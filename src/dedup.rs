use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::quality::normalize_text;
use crate::types::{CandidateRecord, StoredEvent};

/// Similarity thresholds and weights for the pairwise rules. The defaults
/// are behavioral contracts; the rule order is fixed (first match wins).
#[derive(Debug, Clone)]
pub struct DuplicateThresholds {
    pub name_weight: f64,
    pub location_weight: f64,
    pub date_weight: f64,
    pub description_weight: f64,
    pub high_name: f64,
    pub exact_name: f64,
    pub high_overall: f64,
    pub same_location: f64,
    pub similar_name: f64,
    pub same_date: f64,
    pub similar_date: f64,
}

impl Default for DuplicateThresholds {
    fn default() -> Self {
        Self {
            name_weight: 0.4,
            location_weight: 0.25,
            date_weight: 0.25,
            description_weight: 0.1,
            high_name: 0.85,
            exact_name: 0.95,
            high_overall: 0.85,
            same_location: 0.80,
            similar_name: 0.7,
            same_date: 0.9,
            similar_date: 0.7,
        }
    }
}

/// Pairwise field similarities for two candidates. Ephemeral, recomputed
/// per pair.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityScore {
    pub name: f64,
    pub description: f64,
    pub location: f64,
    pub date: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,
    pub reason: Option<String>,
    pub confidence: f64,
}

/// One batch-dedup group: the first-seen record and everything judged a
/// duplicate of it.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub origin_index: usize,
    pub duplicates: Vec<BatchDuplicate>,
}

#[derive(Debug, Clone)]
pub struct BatchDuplicate {
    pub index: usize,
    pub verdict: DuplicateVerdict,
}

/// A persisted record that matched a new candidate.
#[derive(Debug, Clone)]
pub struct StoredDuplicate {
    pub stored: StoredEvent,
    pub verdict: DuplicateVerdict,
}

/// Pairwise similarity scoring and rule-based duplicate classification.
pub struct DuplicateDetector {
    thresholds: DuplicateThresholds,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self {
            thresholds: DuplicateThresholds::default(),
        }
    }

    pub fn with_thresholds(thresholds: DuplicateThresholds) -> Self {
        Self { thresholds }
    }

    /// Sequence-alignment ratio over normalized text; 0 when either side
    /// normalizes to empty.
    pub fn text_similarity(a: &str, b: &str) -> f64 {
        let a = normalize_text(a);
        let b = normalize_text(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        strsim::normalized_levenshtein(&a, &b)
    }

    /// Step function over the day distance between two dates.
    pub fn date_similarity(a: Option<NaiveDate>, b: Option<NaiveDate>) -> f64 {
        let (Some(a), Some(b)) = (a, b) else {
            return 0.0;
        };
        match (a - b).num_days().abs() {
            0 => 1.0,
            1 => 0.9,
            2..=7 => 0.7,
            8..=30 => 0.3,
            _ => 0.0,
        }
    }

    pub fn similarity(&self, a: &CandidateRecord, b: &CandidateRecord) -> SimilarityScore {
        self.similarity_fields(
            &a.name,
            a.description.as_deref(),
            &a.location,
            a.date,
            &b.name,
            b.description.as_deref(),
            &b.location,
            b.date,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn similarity_fields(
        &self,
        a_name: &str,
        a_description: Option<&str>,
        a_location: &str,
        a_date: Option<NaiveDate>,
        b_name: &str,
        b_description: Option<&str>,
        b_location: &str,
        b_date: Option<NaiveDate>,
    ) -> SimilarityScore {
        let name = Self::text_similarity(a_name, b_name);
        let description =
            Self::text_similarity(a_description.unwrap_or(""), b_description.unwrap_or(""));
        let location = Self::text_similarity(a_location, b_location);
        let date = Self::date_similarity(a_date, b_date);
        let t = &self.thresholds;
        let overall = t.name_weight * name
            + t.location_weight * location
            + t.date_weight * date
            + t.description_weight * description;
        SimilarityScore {
            name,
            description,
            location,
            date,
            overall,
        }
    }

    /// Applies the ordered duplicate rules to a similarity score; the first
    /// matching rule wins.
    pub fn classify(&self, score: &SimilarityScore) -> DuplicateVerdict {
        let t = &self.thresholds;
        let reason = if score.name >= t.high_name && score.date >= t.same_date {
            Some("High name similarity with same date")
        } else if score.name >= t.exact_name && score.date >= t.similar_date {
            Some("Exact name match with similar date")
        } else if score.overall >= t.high_overall {
            Some("High overall similarity")
        } else if score.location >= t.same_location
            && score.date >= t.same_date
            && score.name >= t.similar_name
        {
            Some("Same location and date with similar name")
        } else {
            None
        };

        DuplicateVerdict {
            is_duplicate: reason.is_some(),
            reason: reason.map(str::to_string),
            confidence: score.overall,
        }
    }

    pub fn compare(&self, a: &CandidateRecord, b: &CandidateRecord) -> DuplicateVerdict {
        self.classify(&self.similarity(a, b))
    }

    /// Single O(n²) pass over a batch. Each record judged a duplicate of an
    /// earlier origin is grouped under it and never becomes an origin itself.
    pub fn find_batch_duplicates(&self, candidates: &[CandidateRecord]) -> Vec<DuplicateGroup> {
        let mut processed = vec![false; candidates.len()];
        let mut groups = Vec::new();

        for i in 0..candidates.len() {
            if processed[i] {
                continue;
            }
            let mut duplicates = Vec::new();
            for j in (i + 1)..candidates.len() {
                if processed[j] {
                    continue;
                }
                let verdict = self.compare(&candidates[i], &candidates[j]);
                if verdict.is_duplicate {
                    debug!(
                        origin = %candidates[i].name,
                        duplicate = %candidates[j].name,
                        reason = verdict.reason.as_deref().unwrap_or(""),
                        confidence = verdict.confidence,
                        "batch duplicate"
                    );
                    processed[j] = true;
                    duplicates.push(BatchDuplicate { index: j, verdict });
                }
            }
            if !duplicates.is_empty() {
                groups.push(DuplicateGroup {
                    origin_index: i,
                    duplicates,
                });
            }
            processed[i] = true;
        }

        groups
    }

    /// Compares a new candidate against date-adjacent persisted records and
    /// reports the first duplicate hit.
    pub fn find_stored_duplicate(
        &self,
        candidate: &CandidateRecord,
        stored: &[StoredEvent],
    ) -> Option<StoredDuplicate> {
        for event in stored {
            let score = self.similarity_fields(
                &candidate.name,
                candidate.description.as_deref(),
                &candidate.location,
                candidate.date,
                &event.title,
                event.description.as_deref(),
                &event.location,
                Some(event.event_day),
            );
            let verdict = self.classify(&score);
            if verdict.is_duplicate {
                debug!(
                    candidate = %candidate.name,
                    stored = %event.title,
                    stored_id = %event.id,
                    reason = verdict.reason.as_deref().unwrap_or(""),
                    "duplicate of persisted record"
                );
                return Some(StoredDuplicate {
                    stored: event.clone(),
                    verdict,
                });
            }
        }
        None
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}
