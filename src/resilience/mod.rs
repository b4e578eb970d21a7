pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{BackoffStrategy, RetryError, RetryExecutor, RetryPolicy};

use std::sync::Arc;

/// Per-source resilience context: one circuit breaker and the retry
/// executor bound to it. Constructed by the caller and passed down
/// explicitly; there is no process-wide registry of breakers.
pub struct SourceContext {
    source_id: String,
    breaker: Arc<CircuitBreaker>,
    executor: RetryExecutor,
}

impl SourceContext {
    pub fn new(source_id: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let source_id = source_id.into();
        let breaker = Arc::new(CircuitBreaker::new(source_id.clone(), config));
        let executor = RetryExecutor::new(breaker.clone());
        Self {
            source_id,
            breaker,
            executor,
        }
    }

    pub fn with_defaults(source_id: impl Into<String>) -> Self {
        Self::new(source_id, CircuitBreakerConfig::default())
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_owns_one_breaker() {
        let ctx = SourceContext::with_defaults("ulaznice");
        assert_eq!(ctx.source_id(), "ulaznice");
        assert!(Arc::ptr_eq(ctx.breaker(), ctx.executor().breaker()));
        assert_eq!(ctx.breaker().state(), CircuitState::Closed);
    }

    #[test]
    fn contexts_are_independent_across_sources() {
        let a = SourceContext::with_defaults("source_a");
        let b = SourceContext::with_defaults("source_b");
        for _ in 0..5 {
            a.breaker().record_failure();
        }
        assert_eq!(a.breaker().state(), CircuitState::Open);
        assert_eq!(b.breaker().state(), CircuitState::Closed);
    }
}
