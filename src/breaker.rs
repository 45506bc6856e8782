use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

const FAILURE_THRESHOLD: u32 = 3;
const COOLDOWN_SECS: u64 = 30;

#[derive(Default)]
struct BreakerInner {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker for the external text-generation service.
/// After `FAILURE_THRESHOLD` consecutive failures the circuit opens and
/// calls are refused until `COOLDOWN_SECS` have passed (half-open retry).
#[derive(Clone, Default)]
pub struct ServiceBreaker {
    inner: Arc<Mutex<BreakerInner>>,
}

impl ServiceBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when calls should be refused without touching the network.
    pub fn is_open(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.opened_at {
            None => false,
            Some(at) if at.elapsed().as_secs() >= COOLDOWN_SECS => {
                // Cooldown passed: half-open, allow one attempt through.
                inner.opened_at = None;
                inner.consecutive_failures = 0;
                false
            }
            Some(_) => true,
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= FAILURE_THRESHOLD && inner.opened_at.is_none() {
            tracing::warn!(
                failures = inner.consecutive_failures,
                cooldown_secs = COOLDOWN_SECS,
                "Circuit opened for text-generation service"
            );
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }
}

/// Delay before retry attempt `attempt` (0-indexed): 100ms, 200ms, 400ms...
/// capped at 5s.
pub fn backoff_delay_ms(attempt: u32) -> u64 {
    let delay = 100u64.saturating_mul(1u64 << attempt.min(16));
    delay.min(5_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold() {
        let breaker = ServiceBreaker::new();
        assert!(!breaker.is_open());
        for _ in 0..FAILURE_THRESHOLD {
            breaker.record_failure();
        }
        assert!(breaker.is_open());
        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay_ms(0), 100);
        assert_eq!(backoff_delay_ms(1), 200);
        assert_eq!(backoff_delay_ms(2), 400);
        assert_eq!(backoff_delay_ms(10), 5_000);
    }
}
