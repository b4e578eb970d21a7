use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A scraped event candidate as produced by a source adapter.
///
/// Immutable once handed to the pipeline; all cleaning happens on copies,
/// persisted values keep the adapter's original text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub location: String,
    /// Calendar day of the event. Adapters that fail to parse a date hand
    /// over `None`, which the validator treats as a critical issue.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Free-form time text as scraped ("20:00", "8pm", "doors 19:30").
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Identifier of the source adapter that produced this record.
    pub source: String,
}

impl CandidateRecord {
    /// Deterministic fingerprint over the identity fields, used as the
    /// persistence-layer uniqueness key.
    pub fn content_hash(&self) -> String {
        let date = self
            .date
            .map(|d| d.to_string())
            .unwrap_or_default();
        compute_content_hash(&self.name, &date, &self.time, &self.location, &self.source)
    }
}

/// A persisted event as seen by the dedup and upsert paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub event_day: NaiveDate,
    pub start_time: String,
    pub price: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub source: String,
    pub content_hash: String,
}

impl StoredEvent {
    /// Build the persistence row for a validated candidate. Requires the
    /// candidate to carry a date; dateless records never reach the save step.
    pub fn from_candidate(candidate: &CandidateRecord, event_day: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: candidate.name.clone(),
            description: candidate.description.clone(),
            location: candidate.location.clone(),
            event_day,
            start_time: candidate.time.clone(),
            price: candidate.price.clone(),
            url: candidate.link.clone(),
            image_url: candidate.image.clone(),
            source: candidate.source.clone(),
            content_hash: candidate.content_hash(),
        }
    }
}

/// sha256 over the pipe-joined identity fields, hex-encoded.
pub fn compute_content_hash(
    title: &str,
    date: &str,
    time: &str,
    location: &str,
    source: &str,
) -> String {
    let mut s = String::new();
    s.push_str(title);
    s.push('|');
    s.push_str(date);
    s.push('|');
    s.push_str(time);
    s.push('|');
    s.push_str(location);
    s.push('|');
    s.push_str(source);

    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> CandidateRecord {
        CandidateRecord {
            name: "Jazz Night".to_string(),
            description: None,
            location: "Zagreb".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 7, 1),
            time: "20:00".to_string(),
            price: None,
            link: None,
            image: None,
            source: "test_source".to_string(),
        }
    }

    #[test]
    fn content_hash_is_stable() {
        let a = candidate();
        let b = candidate();
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn content_hash_changes_with_identity_fields() {
        let a = candidate();
        let mut b = candidate();
        b.location = "Split".to_string();
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn missing_date_hashes_as_empty_component() {
        let mut a = candidate();
        a.date = None;
        // Same fields but with a date must not collide with the dateless hash.
        assert_ne!(a.content_hash(), candidate().content_hash());
    }
}
