use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::constants::*;
use crate::dedup::DuplicateDetector;
use crate::error::Result;
use crate::quality::{QualityValidator, ValidationResult};
use crate::storage::{EventStore, UpsertOutcome};
use crate::types::{CandidateRecord, StoredEvent};

#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityDistribution {
    /// score >= 80
    pub high: usize,
    /// 60 <= score < 80
    pub medium: usize,
    /// score < 60
    pub low: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueCount {
    pub issue: String,
    pub count: usize,
}

/// Aggregate outcome of one ingestion run. Built once from the run's
/// tallies and read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingReport {
    pub original_count: usize,
    pub valid_count: usize,
    pub low_quality_count: usize,
    pub invalid_count: usize,
    pub batch_duplicate_count: usize,
    pub db_duplicate_count: usize,
    pub saved_count: usize,
    pub upsert: UpsertOutcome,
    pub quality_distribution: QualityDistribution,
    /// Most frequent issues across invalid and low-quality records,
    /// descending by count.
    pub top_issues: Vec<IssueCount>,
    pub duplicate_rate: f64,
    pub average_quality_score: f64,
    pub recommendations: Vec<String>,
}

/// Orchestrates validate -> batch dedup -> store dedup -> persist for one
/// batch of candidates. No direct I/O beyond the persistence collaborator.
pub struct IngestionPipeline {
    validator: QualityValidator,
    detector: DuplicateDetector,
    store: Arc<dyn EventStore>,
    /// Days either side of a candidate's date queried for store dedup.
    days_window: i64,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            validator: QualityValidator::new(),
            detector: DuplicateDetector::new(),
            store,
            days_window: DEDUP_DAYS_WINDOW,
        }
    }

    pub fn with_components(
        validator: QualityValidator,
        detector: DuplicateDetector,
        store: Arc<dyn EventStore>,
        days_window: i64,
    ) -> Self {
        Self {
            validator,
            detector,
            store,
            days_window,
        }
    }

    pub async fn process(
        &self,
        candidates: Vec<CandidateRecord>,
        quality_threshold: f64,
        remove_duplicates: bool,
    ) -> Result<ProcessingReport> {
        let original_count = candidates.len();
        info!(count = original_count, threshold = quality_threshold, "ingestion run started");

        // Step 1: validate and bucket.
        let validations: Vec<ValidationResult> =
            candidates.iter().map(|c| self.validator.validate(c)).collect();

        let mut valid: Vec<&CandidateRecord> = Vec::new();
        let mut low_quality_count = 0usize;
        let mut invalid_count = 0usize;
        let mut flagged_issues: Vec<&ValidationResult> = Vec::new();

        for (candidate, validation) in candidates.iter().zip(&validations) {
            if !validation.is_valid {
                debug!(name = %candidate.name, issues = ?validation.issues, "invalid record");
                invalid_count += 1;
                flagged_issues.push(validation);
            } else if validation.quality_score < quality_threshold {
                warn!(
                    name = %candidate.name,
                    score = validation.quality_score,
                    "record below quality threshold"
                );
                low_quality_count += 1;
                flagged_issues.push(validation);
            } else {
                valid.push(candidate);
            }
        }
        let valid_count = valid.len();
        info!(
            valid = valid_count,
            low_quality = low_quality_count,
            invalid = invalid_count,
            "validation complete"
        );

        // Step 2: in-batch dedup over the valid bucket.
        let mut batch_duplicate_count = 0usize;
        if remove_duplicates && valid.len() > 1 {
            let batch: Vec<CandidateRecord> = valid.iter().map(|&c| c.clone()).collect();
            let groups = self.detector.find_batch_duplicates(&batch);
            let mut drop_indices: Vec<usize> = groups
                .iter()
                .flat_map(|g| g.duplicates.iter().map(|d| d.index))
                .collect();
            batch_duplicate_count = drop_indices.len();
            drop_indices.sort_unstable_by(|a, b| b.cmp(a));
            for index in drop_indices {
                valid.remove(index);
            }
            if batch_duplicate_count > 0 {
                info!(
                    removed = batch_duplicate_count,
                    groups = groups.len(),
                    "in-batch duplicates removed"
                );
            }
        }

        // Step 3: dedup against persisted records.
        let mut db_duplicate_count = 0usize;
        let mut to_save: Vec<StoredEvent> = Vec::new();
        for &candidate in valid.iter() {
            // Dateless records never pass validation, so every survivor
            // carries a date.
            let Some(event_day) = candidate.date else {
                continue;
            };
            let from = event_day - Duration::days(self.days_window);
            let to = event_day + Duration::days(self.days_window);
            let nearby = self.store.find_by_date_range(None, from, to).await?;
            match self.detector.find_stored_duplicate(candidate, &nearby) {
                Some(hit) => {
                    info!(
                        name = %candidate.name,
                        stored_id = %hit.stored.id,
                        reason = hit.verdict.reason.as_deref().unwrap_or(""),
                        "candidate already persisted, skipping"
                    );
                    db_duplicate_count += 1;
                }
                None => to_save.push(StoredEvent::from_candidate(candidate, event_day)),
            }
        }

        // Step 4: persist what survived.
        let upsert = if to_save.is_empty() {
            UpsertOutcome::default()
        } else {
            match self.store.bulk_upsert(&to_save).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(error = %err, batch = to_save.len(), "persistence failed, aborting run");
                    return Err(err);
                }
            }
        };
        let saved_count = to_save.len();
        info!(
            saved = saved_count,
            inserted = upsert.inserted,
            updated = upsert.updated,
            skipped = upsert.skipped,
            "ingestion run finished"
        );

        Ok(self.build_report(ReportInputs {
            original_count,
            validations: &validations,
            flagged_issues: &flagged_issues,
            valid_count,
            low_quality_count,
            invalid_count,
            batch_duplicate_count,
            db_duplicate_count,
            saved_count,
            upsert,
        }))
    }

    fn build_report(&self, inputs: ReportInputs<'_>) -> ProcessingReport {
        let mut distribution = QualityDistribution::default();
        let mut score_sum = 0.0;
        for validation in inputs.validations {
            score_sum += validation.quality_score;
            if validation.quality_score >= REPORT_HIGH_QUALITY_SCORE {
                distribution.high += 1;
            } else if validation.quality_score >= REPORT_MEDIUM_QUALITY_SCORE {
                distribution.medium += 1;
            } else {
                distribution.low += 1;
            }
        }
        let average_quality_score = if inputs.validations.is_empty() {
            0.0
        } else {
            score_sum / inputs.validations.len() as f64
        };

        let mut issue_counts: HashMap<&str, usize> = HashMap::new();
        for validation in inputs.flagged_issues {
            for issue in &validation.issues {
                *issue_counts.entry(issue.as_str()).or_insert(0) += 1;
            }
        }
        let mut top_issues: Vec<IssueCount> = issue_counts
            .into_iter()
            .map(|(issue, count)| IssueCount {
                issue: issue.to_string(),
                count,
            })
            .collect();
        top_issues.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.issue.cmp(&b.issue)));
        top_issues.truncate(REPORT_TOP_ISSUES);

        let duplicate_count = inputs.batch_duplicate_count + inputs.db_duplicate_count;
        let (success_rate, duplicate_rate) = if inputs.original_count == 0 {
            (1.0, 0.0)
        } else {
            (
                inputs.saved_count as f64 / inputs.original_count as f64,
                duplicate_count as f64 / inputs.original_count as f64,
            )
        };

        let mut recommendations = Vec::new();
        if success_rate < REPORT_SUCCESS_RATE_FLOOR {
            recommendations.push(
                "Less than half of the scraped records were saved; review the extraction logic for this source"
                    .to_string(),
            );
        }
        if average_quality_score < REPORT_AVG_SCORE_FLOOR && inputs.original_count > 0 {
            recommendations.push(
                "Average quality score is low; improve field cleaning in the source adapter"
                    .to_string(),
            );
        }
        if duplicate_rate > REPORT_DUPLICATE_RATE_CEILING {
            recommendations.push(
                "High duplicate rate; review scraping frequency and dedup settings".to_string(),
            );
        }
        if let Some(top) = top_issues.first() {
            recommendations.push(format!(
                "Most frequent issue: {} ({} records)",
                top.issue, top.count
            ));
        }

        ProcessingReport {
            original_count: inputs.original_count,
            valid_count: inputs.valid_count,
            low_quality_count: inputs.low_quality_count,
            invalid_count: inputs.invalid_count,
            batch_duplicate_count: inputs.batch_duplicate_count,
            db_duplicate_count: inputs.db_duplicate_count,
            saved_count: inputs.saved_count,
            upsert: inputs.upsert,
            quality_distribution: distribution,
            top_issues,
            duplicate_rate,
            average_quality_score,
            recommendations,
        }
    }
}

struct ReportInputs<'a> {
    original_count: usize,
    validations: &'a [ValidationResult],
    flagged_issues: &'a [&'a ValidationResult],
    valid_count: usize,
    low_quality_count: usize,
    invalid_count: usize,
    batch_duplicate_count: usize,
    db_duplicate_count: usize,
    saved_count: usize,
    upsert: UpsertOutcome,
}
