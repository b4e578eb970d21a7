use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Breaker tuning knobs, one set per source.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive-ish failure count at which the breaker opens.
    pub failure_threshold: u32,
    /// How long an open breaker rejects calls before probing recovery.
    pub recovery_timeout: Duration,
    /// Successes required in half-open state to close again.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
}

/// Per-source failure/success state machine guarding downstream calls.
///
/// All mutation goes through `should_allow_request` / `record_success` /
/// `record_failure`; the inner state is mutex-guarded so concurrent workers
/// for the same source observe consistent transitions.
pub struct CircuitBreaker {
    source_id: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(source_id: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            source_id: source_id.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
            }),
        }
    }

    pub fn with_defaults(source_id: impl Into<String>) -> Self {
        Self::new(source_id, CircuitBreakerConfig::default())
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Whether a call may proceed. While open, performs the timed
    /// Open -> HalfOpen transition once the recovery timeout has elapsed.
    pub fn should_allow_request(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_time
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed > self.config.recovery_timeout {
                    info!(
                        source = %self.source_id,
                        "circuit breaker probing recovery, moving to half-open"
                    );
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                debug!(
                    source = %self.source_id,
                    successes = inner.success_count,
                    "success while half-open"
                );
                if inner.success_count >= self.config.success_threshold {
                    info!(source = %self.source_id, "circuit breaker closed after recovery");
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                }
            }
            CircuitState::Closed => {
                // Healthy path; nothing to count.
            }
            CircuitState::Open => {
                // A success can only be recorded for a call admitted before
                // the breaker opened; ignore it.
            }
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count += 1;
        // The failure count is only reset when the breaker closes, so a
        // failure while half-open is still over the threshold and re-opens.
        // The timestamp is stamped only on the transition to open; straggler
        // failures from calls admitted earlier must not extend the recovery
        // window.
        if inner.failure_count >= self.config.failure_threshold
            && inner.state != CircuitState::Open
        {
            warn!(
                source = %self.source_id,
                failures = inner.failure_count,
                state = ?inner.state,
                "circuit breaker opened"
            );
            inner.state = CircuitState::Open;
            inner.last_failure_time = Some(Instant::now());
        }
    }
}
