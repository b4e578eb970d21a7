use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{ErrorKind, Result};
use crate::resilience::{BackoffStrategy, CircuitBreakerConfig, RetryPolicy};

/// TOML-backed configuration for the ingestion core. Every field falls back
/// to the built-in defaults, so a missing file or partial file is fine.
#[derive(Debug, Default, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub quality: QualitySettings,
    #[serde(default)]
    pub dedup: DedupSettings,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    /// Per-operation retry overrides, keyed by operation name
    /// (`fetch_page`, `parse_events`, `save_to_database`, ...).
    #[serde(default)]
    pub retry: HashMap<String, RetrySettings>,
}

#[derive(Debug, Deserialize)]
pub struct QualitySettings {
    #[serde(default = "default_quality_threshold")]
    pub threshold: f64,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            threshold: default_quality_threshold(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DedupSettings {
    #[serde(default = "default_days_window")]
    pub days_window: i64,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            days_window: default_days_window(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &CircuitBreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            recovery_timeout: Duration::from_secs(settings.recovery_timeout_secs),
            success_threshold: settings.success_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    pub strategy: BackoffStrategy,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    pub retryable_kinds: Vec<ErrorKind>,
    #[serde(default)]
    pub overall_deadline_ms: Option<u64>,
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            strategy: self.strategy,
            backoff_factor: self.backoff_factor,
            jitter: self.jitter,
            retryable_kinds: self.retryable_kinds.iter().copied().collect(),
            overall_deadline: self.overall_deadline_ms.map(Duration::from_millis),
        }
    }
}

impl IngestConfig {
    /// Loads `ingest.toml` from the working directory, falling back to the
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from("ingest.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: IngestConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Retry policy for a named operation: the configured override when
    /// present, otherwise the built-in default for that operation.
    pub fn retry_policy(&self, operation: &str) -> RetryPolicy {
        if let Some(settings) = self.retry.get(operation) {
            return settings.to_policy();
        }
        match operation {
            "fetch_page" => RetryPolicy::fetch_page(),
            "parse_events" => RetryPolicy::parse_events(),
            "save_to_database" => RetryPolicy::save_to_database(),
            _ => RetryPolicy::default(),
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        (&self.circuit_breaker).into()
    }
}

fn default_quality_threshold() -> f64 {
    60.0
}

fn default_days_window() -> i64 {
    crate::constants::DEDUP_DAYS_WINDOW
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

fn default_success_threshold() -> u32 {
    3
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn built_in_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.quality.threshold, 60.0);
        assert_eq!(config.dedup.days_window, 30);
        let breaker = config.breaker_config();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.recovery_timeout, Duration::from_secs(60));
        assert_eq!(breaker.success_threshold, 3);

        let fetch = config.retry_policy("fetch_page");
        assert_eq!(fetch.max_attempts, 3);
        assert_eq!(fetch.base_delay, Duration::from_secs(1));
        let parse = config.retry_policy("parse_events");
        assert_eq!(parse.max_attempts, 2);
        assert_eq!(parse.strategy, BackoffStrategy::Fixed);
        let save = config.retry_policy("save_to_database");
        assert_eq!(save.base_delay, Duration::from_secs(2));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = IngestConfig::load_from("does-not-exist.toml").unwrap();
        assert_eq!(config.quality.threshold, 60.0);
    }

    #[test]
    fn parses_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[quality]
threshold = 75.0

[circuit_breaker]
failure_threshold = 2

[retry.fetch_page]
max_attempts = 5
base_delay_ms = 250
strategy = "linear"
jitter = false
retryable_kinds = ["Network"]
overall_deadline_ms = 10000
"#
        )
        .unwrap();

        let config = IngestConfig::load_from(file.path()).unwrap();
        assert_eq!(config.quality.threshold, 75.0);
        assert_eq!(config.breaker_config().failure_threshold, 2);
        // Unset breaker fields keep their defaults.
        assert_eq!(config.breaker_config().success_threshold, 3);

        let policy = config.retry_policy("fetch_page");
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.strategy, BackoffStrategy::Linear);
        assert!(!policy.jitter);
        assert_eq!(policy.overall_deadline, Some(Duration::from_millis(10_000)));
        assert_eq!(policy.retryable_kinds.len(), 1);

        // Operations without overrides still resolve.
        assert_eq!(config.retry_policy("parse_events").max_attempts, 2);
    }
}
