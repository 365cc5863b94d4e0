//! Shared provider token budget.
//!
//! The provider meters requests in tokens that refill per minute, and the
//! budget is account-global: every concurrent analysis draws from the same
//! bucket. Waiting happens here, in the client layer only: scoring code
//! never blocks on the budget.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug)]
struct BudgetState {
    tokens: f64,
    last_refill: Instant,
}

/// Refill-per-minute token bucket.
#[derive(Debug)]
pub struct TokenBudget {
    state: Mutex<BudgetState>,
    refill_per_minute: f64,
    capacity: f64,
}

impl TokenBudget {
    /// Bucket starts full and caps at one minute of refill.
    pub fn new(tokens_per_minute: u32) -> Self {
        let capacity = f64::from(tokens_per_minute.max(1));
        Self {
            state: Mutex::new(BudgetState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            refill_per_minute: capacity,
            capacity,
        }
    }

    fn refill(&self, state: &mut BudgetState) {
        let elapsed = state.last_refill.elapsed().as_secs_f64();
        state.tokens = (state.tokens + elapsed / 60.0 * self.refill_per_minute).min(self.capacity);
        state.last_refill = Instant::now();
    }

    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    /// Take `n` tokens if the bucket covers them right now.
    pub fn try_acquire(&self, n: u32) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        let needed = f64::from(n);
        if state.tokens >= needed {
            state.tokens -= needed;
            true
        } else {
            false
        }
    }

    /// Take `n` tokens, sleeping until the refill covers the deficit.
    pub async fn acquire(&self, n: u32) {
        loop {
            let deficit = {
                let mut state = self.state.lock();
                self.refill(&mut state);
                let needed = f64::from(n);
                if state.tokens >= needed {
                    state.tokens -= needed;
                    return;
                }
                needed - state.tokens
            };

            let wait = Duration::from_secs_f64(deficit / self.refill_per_minute * 60.0 + 0.05);
            warn!(deficit, wait_secs = wait.as_secs_f64(), "token budget exhausted, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Overwrite the local estimate with the balance the provider reported.
    /// The provider's number is authoritative; other consumers of the same
    /// account may have drained tokens we never saw.
    pub fn sync_remaining(&self, tokens_left: f64) {
        let mut state = self.state.lock();
        state.tokens = tokens_left.clamp(0.0, self.capacity);
        state.last_refill = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_full() {
        let budget = TokenBudget::new(10);
        assert!(budget.try_acquire(10));
        assert!(!budget.try_acquire(1));
    }

    #[test]
    fn test_sync_overrides_estimate() {
        let budget = TokenBudget::new(10);
        budget.sync_remaining(3.0);
        assert!(budget.try_acquire(3));
        assert!(!budget.try_acquire(1));
    }

    #[test]
    fn test_sync_clamped_to_capacity() {
        let budget = TokenBudget::new(10);
        budget.sync_remaining(500.0);
        assert!(budget.available() <= 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_refill() {
        let budget = TokenBudget::new(60); // one token per second
        assert!(budget.try_acquire(60));

        let start = tokio::time::Instant::now();
        budget.acquire(1).await;
        // Needed ~1s of refill; paused clock auto-advances through sleeps.
        assert!(start.elapsed() >= Duration::from_millis(900));
    }
}
