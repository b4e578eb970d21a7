pub mod config;
pub mod constants;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod quality;
pub mod resilience;
pub mod storage;
pub mod types;

pub use config::IngestConfig;
pub use dedup::{DuplicateDetector, DuplicateVerdict, SimilarityScore};
pub use error::{classify, ErrorKind, IngestError};
pub use pipeline::{IngestionPipeline, ProcessingReport};
pub use quality::{QualityValidator, ValidationResult};
pub use resilience::{CircuitBreaker, RetryExecutor, RetryPolicy, SourceContext};
pub use storage::{EventStore, InMemoryEventStore};
pub use types::{CandidateRecord, StoredEvent};
