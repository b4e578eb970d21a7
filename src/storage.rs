use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::types::StoredEvent;

/// Counts returned from a bulk upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Persistence collaborator for the ingestion pipeline.
///
/// Conflict resolution is keyed by the record's content hash, which the
/// backing store must enforce as unique; that constraint is the last-resort
/// guard against races between concurrent pipeline runs for one source.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events whose day falls within `[from, to]`, optionally restricted to
    /// one source. Used by persisted-store dedup.
    async fn find_by_date_range(
        &self,
        source: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StoredEvent>>;

    /// Upserts the batch atomically: a failed write must leave no partial
    /// state behind.
    async fn bulk_upsert(&self, events: &[StoredEvent]) -> Result<UpsertOutcome>;
}

/// In-memory store for development and tests, keyed by content hash.
pub struct InMemoryEventStore {
    events: Arc<Mutex<HashMap<String, StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn find_by_date_range(
        &self,
        source: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StoredEvent>> {
        let events = self.events.lock().unwrap();
        let matches: Vec<StoredEvent> = events
            .values()
            .filter(|e| e.event_day >= from && e.event_day <= to)
            .filter(|e| source.map_or(true, |s| e.source == s))
            .cloned()
            .collect();
        debug!(
            from = %from,
            to = %to,
            source = source.unwrap_or("*"),
            count = matches.len(),
            "date range query"
        );
        Ok(matches)
    }

    async fn bulk_upsert(&self, batch: &[StoredEvent]) -> Result<UpsertOutcome> {
        // One lock held for the whole batch stands in for a transaction.
        let mut events = self.events.lock().unwrap();
        let mut outcome = UpsertOutcome::default();
        for event in batch {
            match events.get(&event.content_hash) {
                None => {
                    events.insert(event.content_hash.clone(), event.clone());
                    outcome.inserted += 1;
                }
                Some(existing) => {
                    let changed = existing.description != event.description
                        || existing.price != event.price
                        || existing.url != event.url
                        || existing.image_url != event.image_url;
                    if changed {
                        let mut updated = event.clone();
                        updated.id = existing.id;
                        events.insert(event.content_hash.clone(), updated);
                        outcome.updated += 1;
                    } else {
                        outcome.skipped += 1;
                    }
                }
            }
        }
        debug!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "bulk upsert"
        );
        Ok(outcome)
    }
}
