use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use event_ingest::config::IngestConfig;
use event_ingest::logging;
use event_ingest::pipeline::IngestionPipeline;
use event_ingest::quality::QualityValidator;
use event_ingest::storage::InMemoryEventStore;
use event_ingest::types::CandidateRecord;

#[derive(Parser)]
#[command(name = "event_ingest")]
#[command(about = "Resilient ingestion core for scraped event data")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a JSON file of candidate records
    Process {
        /// Path to a JSON array of candidate records
        #[arg(long)]
        input: PathBuf,
        /// Only process candidates from this source
        #[arg(long)]
        source: Option<String>,
        /// Minimum quality score for a record to be persisted
        #[arg(long)]
        quality_threshold: Option<f64>,
        /// Skip in-batch duplicate removal
        #[arg(long)]
        keep_duplicates: bool,
        /// Path to the TOML config file
        #[arg(long, default_value = "ingest.toml")]
        config: PathBuf,
    },
    /// Validate candidates and print per-record results without persisting
    Validate {
        /// Path to a JSON array of candidate records
        #[arg(long)]
        input: PathBuf,
    },
}

fn load_candidates(path: &PathBuf) -> anyhow::Result<Vec<CandidateRecord>> {
    let content = fs::read_to_string(path)?;
    let candidates: Vec<CandidateRecord> = serde_json::from_str(&content)?;
    Ok(candidates)
}

fn filter_by_source(candidates: Vec<CandidateRecord>, source: Option<&str>) -> Vec<CandidateRecord> {
    match source {
        Some(source) => candidates
            .into_iter()
            .filter(|c| c.source == source)
            .collect(),
        None => candidates,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            source,
            quality_threshold,
            keep_duplicates,
            config,
        } => {
            let config = IngestConfig::load_from(&config)?;
            let threshold = quality_threshold.unwrap_or(config.quality.threshold);
            let candidates = load_candidates(&input)?;
            info!(count = candidates.len(), input = %input.display(), "loaded candidates");
            let candidates = filter_by_source(candidates, source.as_deref());
            if let Some(source) = &source {
                info!(source = %source, count = candidates.len(), "filtered candidates by source");
            }
            println!("🔄 Processing {} candidate(s)...", candidates.len());

            let store = Arc::new(InMemoryEventStore::new());
            let pipeline = IngestionPipeline::with_components(
                QualityValidator::new(),
                event_ingest::dedup::DuplicateDetector::new(),
                store,
                config.dedup.days_window,
            );

            match pipeline.process(candidates, threshold, !keep_duplicates).await {
                Ok(report) => {
                    println!("\n📊 Ingestion report:");
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    if !report.recommendations.is_empty() {
                        println!("\n💡 Recommendations:");
                        for recommendation in &report.recommendations {
                            println!("   - {recommendation}");
                        }
                    }
                }
                Err(e) => {
                    error!("Pipeline run failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Validate { input } => {
            let candidates = load_candidates(&input)?;
            println!("🔍 Validating {} candidate(s)...", candidates.len());

            let validator = QualityValidator::new();
            for candidate in &candidates {
                let result = validator.validate(candidate);
                let status = if !result.is_valid {
                    "INVALID"
                } else if result.issues.is_empty() {
                    "OK"
                } else {
                    "WARN"
                };
                println!(
                    "   [{status}] {:5.1}  {} ({})",
                    result.quality_score, candidate.name, candidate.source
                );
                for issue in &result.issues {
                    println!("        - {issue}");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(name: &str, source: &str) -> CandidateRecord {
        CandidateRecord {
            name: name.to_string(),
            description: None,
            location: "Zagreb".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 7, 1),
            time: "20:00".to_string(),
            price: None,
            link: None,
            image: None,
            source: source.to_string(),
        }
    }

    #[test]
    fn process_parses_the_source_flag() {
        let cli = Cli::try_parse_from([
            "event_ingest",
            "process",
            "--input",
            "candidates.json",
            "--source",
            "ulaznice",
        ])
        .unwrap();
        match cli.command {
            Commands::Process { source, .. } => assert_eq!(source.as_deref(), Some("ulaznice")),
            _ => panic!("expected the process subcommand"),
        }
    }

    #[test]
    fn source_filter_keeps_only_matching_records() {
        let candidates = vec![
            record("Jazz Night", "ulaznice"),
            record("Rock Fest", "other_portal"),
            record("Klapa Concert", "ulaznice"),
        ];
        let filtered = filter_by_source(candidates, Some("ulaznice"));
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|c| c.source == "ulaznice"));
    }

    #[test]
    fn no_source_filter_keeps_everything() {
        let candidates = vec![record("Jazz Night", "ulaznice"), record("Rock Fest", "other_portal")];
        assert_eq!(filter_by_source(candidates, None).len(), 2);
    }
}
