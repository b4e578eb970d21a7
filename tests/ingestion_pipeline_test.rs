use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use event_ingest::config::IngestConfig;
use event_ingest::dedup::DuplicateDetector;
use event_ingest::pipeline::IngestionPipeline;
use event_ingest::quality::QualityValidator;
use event_ingest::resilience::{RetryError, SourceContext};
use event_ingest::storage::{EventStore, InMemoryEventStore};
use event_ingest::types::CandidateRecord;
use std::io::Write;

fn candidate(
    name: &str,
    description: &str,
    date: NaiveDate,
    location: &str,
    source: &str,
) -> CandidateRecord {
    CandidateRecord {
        name: name.to_string(),
        description: Some(description.to_string()),
        location: location.to_string(),
        date: Some(date),
        time: "20:00".to_string(),
        price: Some("10 EUR".to_string()),
        link: None,
        image: None,
        source: source.to_string(),
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn pipeline(store: Arc<InMemoryEventStore>) -> IngestionPipeline {
    // Pin "today" so the 2024 fixture dates stay in the valid window.
    IngestionPipeline::with_components(
        QualityValidator::with_today(day(2024, 6, 15)),
        DuplicateDetector::new(),
        store,
        30,
    )
}

#[tokio::test]
async fn batch_with_near_identical_pair_keeps_the_origin() -> Result<()> {
    let store = Arc::new(InMemoryEventStore::new());
    let batch = vec![
        candidate(
            "Jazz Night",
            "An evening of live jazz at the riverside stage. Doors at 19h.",
            day(2024, 7, 1),
            "Zagreb",
            "ulaznice",
        ),
        candidate(
            "Jazz Night",
            "Live jazz at the riverside stage, doors open 19h.",
            day(2024, 7, 1),
            "Zagreb",
            "ulaznice",
        ),
        candidate(
            "Rock Fest",
            "Two stages of regional rock bands, food stalls and camping.",
            day(2024, 8, 10),
            "Split",
            "ulaznice",
        ),
    ];

    let report = pipeline(store.clone()).process(batch, 60.0, true).await?;

    assert_eq!(report.original_count, 3);
    assert_eq!(report.batch_duplicate_count, 1);
    assert_eq!(report.saved_count, 2);
    assert_eq!(report.db_duplicate_count, 0);

    let saved = store
        .find_by_date_range(None, day(2024, 7, 1), day(2024, 8, 31))
        .await?;
    let mut titles: Vec<&str> = saved.iter().map(|e| e.title.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(titles, vec!["Jazz Night", "Rock Fest"]);
    Ok(())
}

#[tokio::test]
async fn rescrape_of_a_persisted_event_is_rejected() -> Result<()> {
    let store = Arc::new(InMemoryEventStore::new());
    let p = pipeline(store.clone());

    let first = p
        .process(
            vec![candidate(
                "Klapa Concert",
                "Traditional klapa singing under the stars in the old town.",
                day(2024, 7, 5),
                "Trogir",
                "visit_trogir",
            )],
            60.0,
            true,
        )
        .await?;
    assert_eq!(first.saved_count, 1);

    // A different source scrapes the same concert a day off.
    let second = p
        .process(
            vec![candidate(
                "Klapa Concert",
                "Klapa singing in the old town square.",
                day(2024, 7, 6),
                "Trogir",
                "other_portal",
            )],
            60.0,
            true,
        )
        .await?;
    assert_eq!(second.db_duplicate_count, 1);
    assert_eq!(second.saved_count, 0);
    assert_eq!(store.len(), 1);
    Ok(())
}

#[tokio::test]
async fn store_dedup_stops_at_the_thirty_day_window() -> Result<()> {
    let store = Arc::new(InMemoryEventStore::new());
    let p = pipeline(store.clone());
    let screening = |date: NaiveDate| {
        candidate(
            "Summer Cinema",
            "Open-air screenings in the fortress courtyard every evening.",
            date,
            "Zagreb",
            "kino_portal",
        )
    };

    let first = p.process(vec![screening(day(2024, 7, 1))], 60.0, true).await?;
    assert_eq!(first.saved_count, 1);

    // Thirty days out is still inside the lookup window, so the repeat
    // listing is caught against the stored event.
    let inside = p.process(vec![screening(day(2024, 7, 31))], 60.0, true).await?;
    assert_eq!(inside.db_duplicate_count, 1);
    assert_eq!(inside.saved_count, 0);

    // One day further the stored event is never consulted and the listing
    // is treated as a new event.
    let outside = p.process(vec![screening(day(2024, 8, 1))], 60.0, true).await?;
    assert_eq!(outside.db_duplicate_count, 0);
    assert_eq!(outside.saved_count, 1);
    assert_eq!(store.len(), 2);
    Ok(())
}

#[tokio::test]
async fn nameless_candidate_is_invalid_regardless_of_other_fields() -> Result<()> {
    let store = Arc::new(InMemoryEventStore::new());
    let mut nameless = candidate(
        "",
        "A perfectly fine description that would otherwise pass validation.",
        day(2024, 7, 1),
        "Zagreb",
        "ulaznice",
    );
    nameless.name = String::new();

    let report = pipeline(store.clone()).process(vec![nameless], 60.0, true).await?;
    assert_eq!(report.invalid_count, 1);
    assert_eq!(report.saved_count, 0);
    assert!(report
        .top_issues
        .iter()
        .any(|i| i.issue == "Event name is empty or missing"));
    assert!(store.is_empty());
    Ok(())
}

#[tokio::test]
async fn low_quality_candidate_is_segregated_not_rejected() -> Result<()> {
    let store = Arc::new(InMemoryEventStore::new());
    let mut weak = candidate(
        "Test",
        "lorem ipsum placeholder sample text test description description here add description no description",
        day(2024, 7, 1),
        "tbd",
        "junk_portal",
    );
    weak.link = Some("http://test.com/event".to_string());

    let report = pipeline(store.clone()).process(vec![weak], 60.0, true).await?;
    assert_eq!(report.low_quality_count, 1);
    assert_eq!(report.invalid_count, 0);
    assert_eq!(report.valid_count, 0);
    assert_eq!(report.saved_count, 0);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.contains("quality score")));
    Ok(())
}

#[tokio::test]
async fn report_serializes_for_consumers() -> Result<()> {
    let store = Arc::new(InMemoryEventStore::new());
    let report = pipeline(store)
        .process(
            vec![candidate(
                "Jazz Night",
                "An evening of live jazz at the riverside stage. Doors at 19h.",
                day(2024, 7, 1),
                "Zagreb",
                "ulaznice",
            )],
            60.0,
            true,
        )
        .await?;

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["original_count"], 1);
    assert_eq!(json["saved_count"], 1);
    assert!(json["quality_distribution"]["high"].is_number());
    Ok(())
}

#[tokio::test]
async fn retry_executor_protects_a_flaky_adapter_end_to_end() -> Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};

    let config = IngestConfig::default();
    let ctx = SourceContext::new("flaky_portal", config.breaker_config());
    let mut policy = config.retry_policy("fetch_page");
    policy.base_delay = std::time::Duration::from_millis(1);
    policy.jitter = false;

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let batch: Vec<CandidateRecord> = ctx
        .executor()
        .execute("fetch_page", &policy, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("connection reset by peer");
                }
                Ok(vec![candidate(
                    "Jazz Night",
                    "An evening of live jazz at the riverside stage. Doors at 19h.",
                    day(2024, 7, 1),
                    "Zagreb",
                    "flaky_portal",
                )])
            }
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    let store = Arc::new(InMemoryEventStore::new());
    let report = pipeline(store).process(batch, 60.0, true).await?;
    assert_eq!(report.saved_count, 1);
    Ok(())
}

#[tokio::test]
async fn open_breaker_fails_fast_for_a_source() {
    let ctx = SourceContext::with_defaults("down_portal");
    for _ in 0..5 {
        ctx.breaker().record_failure();
    }

    let result: Result<Vec<CandidateRecord>, RetryError> = ctx
        .executor()
        .execute("fetch_page", &event_ingest::resilience::RetryPolicy::fetch_page(), || async {
            panic!("operation must not run while the breaker is open");
        })
        .await;

    assert!(matches!(result, Err(RetryError::CircuitOpen { .. })));
}

#[tokio::test]
async fn cli_shaped_json_round_trips_into_candidates() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"[{{
            "name": "Jazz Night",
            "description": "An evening of live jazz. Doors at 19h.",
            "location": "Zagreb",
            "date": "2024-07-01",
            "time": "20:00",
            "source": "ulaznice"
        }}]"#
    )?;

    let content = std::fs::read_to_string(file.path())?;
    let candidates: Vec<CandidateRecord> = serde_json::from_str(&content)?;
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].name, "Jazz Night");
    assert_eq!(candidates[0].date, Some(day(2024, 7, 1)));
    assert_eq!(candidates[0].price, None);

    let store = Arc::new(InMemoryEventStore::new());
    let report = pipeline(store).process(candidates, 60.0, true).await?;
    assert_eq!(report.saved_count, 1);
    Ok(())
}
