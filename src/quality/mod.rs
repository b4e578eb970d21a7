pub mod normalize;

pub use normalize::normalize_text;

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;
use url::{ParseError, Url};

use crate::constants::*;
use crate::types::CandidateRecord;

/// Per-field validation outcome. Created once per pass, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidation {
    pub valid: bool,
    pub issues: Vec<String>,
}

impl FieldValidation {
    fn from_issues(issues: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }
}

/// Validation verdict for one candidate record.
///
/// `is_valid` is false only for critical problems (missing name or any date
/// issue); everything else just lowers the quality score, and callers
/// segregate low-scoring records with their own threshold.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub quality_score: f64,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub field_validation: BTreeMap<&'static str, FieldValidation>,
}

/// Field-level validation rules and the composite 0-100 quality score.
pub struct QualityValidator {
    today: NaiveDate,
}

impl QualityValidator {
    pub fn new() -> Self {
        Self {
            today: Utc::now().date_naive(),
        }
    }

    /// Pin "today" for deterministic date-rule evaluation in tests.
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn validate(&self, record: &CandidateRecord) -> ValidationResult {
        let name = self.validate_name(&record.name);
        let description = self.validate_description(record.description.as_deref());
        let location = self.validate_location(&record.location);
        let date = self.validate_date(record.date);
        let url = self.validate_url(record.link.as_deref());

        // Missing name and any date problem are the only validity-breaking
        // conditions; the rest is score-only.
        let is_valid = !record.name.trim().is_empty() && date.valid;

        let mut score = 100.0;
        for (field, weight, max_issues) in [
            (&name, NAME_WEIGHT, NAME_MAX_ISSUES),
            (&description, DESCRIPTION_WEIGHT, DESCRIPTION_MAX_ISSUES),
            (&location, LOCATION_WEIGHT, LOCATION_MAX_ISSUES),
            (&date, DATE_WEIGHT, DATE_MAX_ISSUES),
            (&url, URL_WEIGHT, URL_MAX_ISSUES),
        ] {
            if !field.valid {
                score -= weight * (field.issues.len() as f64 / max_issues);
            }
        }
        let quality_score = score.clamp(0.0, 100.0);

        let mut issues = Vec::new();
        for field in [&name, &description, &location, &date, &url] {
            issues.extend(field.issues.iter().cloned());
        }

        let mut warnings = Vec::new();
        if is_valid {
            if quality_score < LOW_QUALITY_WARNING_SCORE {
                warnings.push("Event has a low quality score".to_string());
            } else if !issues.is_empty() {
                warnings.push("Event has quality issues but passes validation".to_string());
            }
        }

        debug!(
            name = %record.name,
            source = %record.source,
            score = quality_score,
            valid = is_valid,
            issue_count = issues.len(),
            "validated candidate"
        );

        let field_validation = BTreeMap::from([
            ("name", name),
            ("description", description),
            ("location", location),
            ("date", date),
            ("url", url),
        ]);

        ValidationResult {
            is_valid,
            quality_score,
            issues,
            warnings,
            field_validation,
        }
    }

    fn validate_name(&self, name: &str) -> FieldValidation {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return FieldValidation::from_issues(vec![
                "Event name is empty or missing".to_string()
            ]);
        }

        let mut issues = Vec::new();
        let char_count = trimmed.chars().count();
        if char_count < NAME_MIN_LEN {
            issues.push("Event name is too short".to_string());
        }
        if char_count > NAME_MAX_LEN {
            issues.push("Event name is too long".to_string());
        }

        let lower = trimmed.to_lowercase();
        if NAME_PLACEHOLDERS.contains(&lower.as_str()) {
            issues.push("Event name is a placeholder".to_string());
        }

        let words: Vec<&str> = lower.split_whitespace().collect();
        if words.len() > 1 && words.windows(2).all(|w| w[0] == w[1]) {
            issues.push("Event name repeats the same word".to_string());
        }

        for phrase in SPAM_PHRASES {
            if lower.contains(phrase) {
                issues.push(format!("Event name contains spam phrase '{phrase}'"));
            }
        }

        if char_count > NAME_UPPERCASE_MIN_LEN
            && trimmed.chars().any(char::is_alphabetic)
            && trimmed == trimmed.to_uppercase()
        {
            issues.push("Event name is entirely upper-case".to_string());
        }

        let special = trimmed
            .chars()
            .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
            .count();
        if special as f64 / char_count as f64 > NAME_SPECIAL_CHAR_RATIO {
            issues.push("Event name contains too many special characters".to_string());
        }

        FieldValidation::from_issues(issues)
    }

    fn validate_description(&self, description: Option<&str>) -> FieldValidation {
        let trimmed = description.unwrap_or("").trim();
        if trimmed.is_empty() {
            return FieldValidation::from_issues(vec!["Description is empty".to_string()]);
        }

        let mut issues = Vec::new();
        let char_count = trimmed.chars().count();
        if char_count < DESCRIPTION_MIN_LEN {
            issues.push("Description is too short".to_string());
        }
        if char_count > DESCRIPTION_MAX_LEN {
            issues.push("Description is too long".to_string());
        }

        let lower = trimmed.to_lowercase();
        for placeholder in DESCRIPTION_PLACEHOLDERS {
            if lower.contains(placeholder) {
                issues.push(format!("Description contains placeholder text '{placeholder}'"));
            }
        }
        for phrase in SPAM_PHRASES {
            if lower.contains(phrase) {
                issues.push(format!("Description contains spam phrase '{phrase}'"));
            }
        }

        if char_count > DESCRIPTION_SENTENCE_CHECK_LEN
            && !trimmed.contains(['.', '!', '?'])
        {
            issues.push("Long description has no sentence structure".to_string());
        }

        let words: Vec<&str> = lower.split_whitespace().collect();
        if !words.is_empty() {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for word in &words {
                if word.chars().count() > 3 {
                    *counts.entry(word).or_insert(0) += 1;
                }
            }
            let total = words.len() as f64;
            let mut repeated: Vec<&str> = counts
                .iter()
                .filter(|(_, &count)| count > 1 && count as f64 / total > DESCRIPTION_WORD_REPEAT_RATIO)
                .map(|(&word, _)| word)
                .collect();
            repeated.sort_unstable();
            for word in repeated {
                issues.push(format!("Description repeats the word '{word}' excessively"));
            }
        }

        FieldValidation::from_issues(issues)
    }

    fn validate_location(&self, location: &str) -> FieldValidation {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return FieldValidation::from_issues(vec!["Location is empty".to_string()]);
        }

        let mut issues = Vec::new();
        let char_count = trimmed.chars().count();
        if char_count < LOCATION_MIN_LEN {
            issues.push("Location is too short".to_string());
        }
        if char_count > LOCATION_MAX_LEN {
            issues.push("Location is too long".to_string());
        }

        let lower = trimmed.to_lowercase();
        if LOCATION_PLACEHOLDERS.contains(&lower.as_str()) {
            issues.push("Location is a placeholder".to_string());
        }

        if char_count > LOCATION_GAZETTEER_MIN_LEN {
            let normalized = normalize_text(trimmed);
            if !KNOWN_PLACES.iter().any(|place| normalized.contains(place)) {
                issues.push("Location does not mention a known place".to_string());
            }
        }

        FieldValidation::from_issues(issues)
    }

    fn validate_date(&self, date: Option<NaiveDate>) -> FieldValidation {
        let Some(date) = date else {
            return FieldValidation::from_issues(vec!["Event date is missing".to_string()]);
        };

        let mut issues = Vec::new();
        let yesterday = self.today - Duration::days(1);
        if date < yesterday {
            issues.push("Event date is in the past".to_string());
        }
        if date > self.today + Duration::days(DATE_MAX_FUTURE_DAYS) {
            issues.push("Event date is too far in the future".to_string());
        }
        if date.year() < DATE_MIN_YEAR || date.year() > DATE_MAX_YEAR {
            issues.push("Event year is out of range".to_string());
        }

        FieldValidation::from_issues(issues)
    }

    fn validate_url(&self, url: Option<&str>) -> FieldValidation {
        // An absent URL is always valid; adapters frequently omit links.
        let Some(raw) = url.map(str::trim).filter(|s| !s.is_empty()) else {
            return FieldValidation::from_issues(Vec::new());
        };

        let mut issues = Vec::new();
        match Url::parse(raw) {
            Ok(parsed) => {
                if !matches!(parsed.scheme(), "http" | "https") {
                    issues.push("URL scheme is not supported".to_string());
                }
                match parsed.host_str() {
                    Some(host) => {
                        if SUSPICIOUS_HOSTS.contains(&host) {
                            issues.push("URL host is suspicious".to_string());
                        }
                    }
                    None => issues.push("URL has no host".to_string()),
                }
            }
            Err(ParseError::RelativeUrlWithoutBase) => {
                issues.push("URL is missing a scheme".to_string());
            }
            Err(_) => issues.push("URL is malformed".to_string()),
        }

        FieldValidation::from_issues(issues)
    }
}

impl Default for QualityValidator {
    fn default() -> Self {
        Self::new()
    }
}
