use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use crate::error::{classify, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Exponential,
    Linear,
    Fixed,
    Immediate,
}

/// Bounded-retry policy for one named operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
    pub backoff_factor: f64,
    pub jitter: bool,
    /// Error kinds worth another attempt; anything else fails fast.
    pub retryable_kinds: HashSet<ErrorKind>,
    /// Upper bound on total retry time for the operation. `None` means the
    /// attempt budget alone bounds the run.
    pub overall_deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            strategy: BackoffStrategy::Exponential,
            backoff_factor: 2.0,
            jitter: true,
            retryable_kinds: ErrorKind::recoverable_kinds(),
            overall_deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Default policy for page fetches.
    pub fn fetch_page() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            retryable_kinds: [ErrorKind::Network, ErrorKind::Timeout].into_iter().collect(),
            ..Self::default()
        }
    }

    /// Default policy for parsing fetched payloads into candidates.
    pub fn parse_events() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
            strategy: BackoffStrategy::Fixed,
            retryable_kinds: [ErrorKind::Parsing, ErrorKind::Validation]
                .into_iter()
                .collect(),
            ..Self::default()
        }
    }

    /// Default policy for persistence writes.
    pub fn save_to_database() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            retryable_kinds: [ErrorKind::Network, ErrorKind::Timeout].into_iter().collect(),
            ..Self::default()
        }
    }

    /// Backoff before attempt `attempt + 1`, without jitter or clamping.
    fn raw_delay(&self, attempt: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Exponential => {
                self.base_delay.mul_f64(self.backoff_factor.powi(attempt as i32))
            }
            BackoffStrategy::Linear => self.base_delay.mul_f64((attempt + 1) as f64),
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Immediate => Duration::ZERO,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let mut delay = self.raw_delay(attempt);
        if self.jitter && !delay.is_zero() {
            let factor = rand::thread_rng().gen_range(0.5..1.0);
            delay = delay.mul_f64(factor);
        }
        delay.min(self.max_delay)
    }
}

#[derive(Error, Debug)]
pub enum RetryError {
    #[error("circuit breaker open for source '{source_id}', '{operation}' not attempted")]
    CircuitOpen { source_id: String, operation: String },

    #[error("'{operation}' exceeded its retry deadline after {attempts} attempt(s)")]
    DeadlineExceeded { operation: String, attempts: u32 },

    #[error(transparent)]
    Operation(#[from] anyhow::Error),
}

/// Wraps fallible source-adapter operations with bounded retries, backoff
/// and the per-source circuit breaker.
pub struct RetryExecutor {
    breaker: Arc<CircuitBreaker>,
}

impl RetryExecutor {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self { breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Runs `operation` under `policy`, consulting the breaker before the
    /// first attempt and reporting the outcome back to it. On exhaustion the
    /// original error of the last attempt is surfaced unchanged; the backoff
    /// sleep is cooperative and never blocks other sources' workers.
    pub async fn execute<T, F, Fut>(
        &self,
        operation_name: &str,
        policy: &RetryPolicy,
        mut operation: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if !self.breaker.should_allow_request() {
            warn!(
                source = %self.breaker.source_id(),
                operation = operation_name,
                "request rejected, circuit open"
            );
            return Err(RetryError::CircuitOpen {
                source_id: self.breaker.source_id().to_string(),
                operation: operation_name.to_string(),
            });
        }

        let deadline = policy.overall_deadline.map(|d| Instant::now() + d);

        for attempt in 0..policy.max_attempts {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(RetryError::DeadlineExceeded {
                        operation: operation_name.to_string(),
                        attempts: attempt,
                    });
                }
            }

            match operation().await {
                Ok(value) => {
                    self.breaker.record_success();
                    if attempt > 0 {
                        debug!(
                            operation = operation_name,
                            attempt = attempt + 1,
                            "operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let kind = classify(&err);
                    if !policy.retryable_kinds.contains(&kind) {
                        warn!(
                            operation = operation_name,
                            kind = ?kind,
                            error = %err,
                            "non-retryable error, failing fast"
                        );
                        self.breaker.record_failure();
                        return Err(RetryError::Operation(err));
                    }
                    if attempt + 1 >= policy.max_attempts {
                        warn!(
                            operation = operation_name,
                            attempts = policy.max_attempts,
                            error = %err,
                            "retry budget exhausted"
                        );
                        self.breaker.record_failure();
                        return Err(RetryError::Operation(err));
                    }

                    let delay = policy.delay_for_attempt(attempt);
                    if let Some(deadline) = deadline {
                        if Instant::now() + delay >= deadline {
                            self.breaker.record_failure();
                            return Err(RetryError::DeadlineExceeded {
                                operation: operation_name.to_string(),
                                attempts: attempt + 1,
                            });
                        }
                    }
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        kind = ?kind,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // Only reachable with max_attempts == 0.
        Err(RetryError::Operation(anyhow::anyhow!(
            "'{operation_name}' configured with zero attempts"
        )))
    }
}
