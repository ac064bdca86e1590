//! Exponential backoff with jitter for outbox retries
//!
//! Given retry count `r`, base `B`, and cap `M` (all seconds):
//! `raw = min(B * 2^r, M)`, actual delay uniform in `[0, raw)`.
//!
//! `outbox.rs` inlines this same formula directly in SQL (keyed on the
//! row's real `retries` column) so `claim_pending`'s claim-and-reschedule
//! stays one atomic statement. `base_secs`/`max_secs` here are the `B`/`M`
//! bound into that SQL; `next_retry_at`/`raw_delay_secs` stay as the
//! reference implementation the formula is unit-tested against.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base_secs: i64,
    pub max_secs: i64,
}

impl BackoffPolicy {
    pub fn new(base_secs: i64, max_secs: i64) -> Self {
        Self {
            base_secs,
            max_secs,
        }
    }

    /// Next-retry timestamp for a row about to carry retry count `retries`.
    pub fn next_retry_at(self, retries: i32, now: DateTime<Utc>) -> DateTime<Utc> {
        let raw = self.raw_delay_secs(retries);
        let jitter_secs = if raw <= 0 {
            0
        } else {
            rand::rng().random_range(0..raw)
        };
        now + Duration::seconds(jitter_secs)
    }

    fn raw_delay_secs(self, retries: i32) -> i64 {
        let exp = 2i64.saturating_pow(retries.max(0) as u32);
        self.base_secs.saturating_mul(exp).min(self.max_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_delay_grows_exponentially_until_capped() {
        let policy = BackoffPolicy::new(5, 300);
        assert_eq!(policy.raw_delay_secs(0), 5);
        assert_eq!(policy.raw_delay_secs(1), 10);
        assert_eq!(policy.raw_delay_secs(2), 20);
        assert_eq!(policy.raw_delay_secs(6), 300); // 5*64=320, capped
    }

    #[test]
    fn next_retry_is_never_before_now() {
        let policy = BackoffPolicy::new(5, 300);
        let now = Utc::now();
        for r in 0..10 {
            let next = policy.next_retry_at(r, now);
            assert!(next >= now);
            assert!(next <= now + Duration::seconds(300));
        }
    }
}
