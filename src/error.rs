use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {message}")]
    Store { message: String },
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Bounded classification of an arbitrary failure raised at the source
/// adapter or persistence boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Parsing,
    Database,
    Validation,
    Permission,
    Configuration,
    Unknown,
}

impl ErrorKind {
    /// Kinds worth retrying; everything else fails fast.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Timeout | ErrorKind::Parsing)
    }

    pub fn recoverable_kinds() -> HashSet<ErrorKind> {
        [ErrorKind::Network, ErrorKind::Timeout, ErrorKind::Parsing]
            .into_iter()
            .collect()
    }
}

/// Maps an arbitrary error into an [`ErrorKind`] by keyword-matching its
/// lower-cased message chain. External fetch/parse libraries raise
/// heterogeneous error types, so the full rendered chain is the only stable
/// surface to classify on. Pure function, no I/O.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    let text = format!("{err:#}").to_lowercase();

    if contains_any(&text, &["network", "connection", "dns", "host"]) {
        ErrorKind::Network
    } else if text.contains("timeout") {
        ErrorKind::Timeout
    } else if contains_any(&text, &["parse", "invalid html"]) {
        ErrorKind::Parsing
    } else if contains_any(&text, &["database", "sql", "constraint"]) {
        ErrorKind::Database
    } else if contains_any(&text, &["validation", "invalid"]) {
        ErrorKind::Validation
    } else if contains_any(&text, &["permission", "forbidden", "unauthorized"]) {
        ErrorKind::Permission
    } else if contains_any(&text, &["config", "setting"]) {
        ErrorKind::Configuration
    } else {
        ErrorKind::Unknown
    }
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}
