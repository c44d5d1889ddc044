//! Per-enforcer exponential backoff

use dashmap::DashMap;
use quota_types::EnforcerId;
use rand::Rng;
use std::time::Duration;

use crate::config::BackoffConfig;

/// Tracks consecutive failures per enforcer and turns them into retry delays
#[derive(Debug)]
pub struct BackoffPolicy {
    config: BackoffConfig,
    failures: DashMap<EnforcerId, u32>,
}

impl BackoffPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: DashMap::new(),
        }
    }

    /// Record a failure and return how long to wait before retrying.
    ///
    /// The delay grows by `multiplier` per consecutive failure and is capped
    /// at `max_delay_ms`. With jitter enabled the delay is drawn uniformly
    /// from the upper half of that range.
    pub fn next_delay(&self, id: &EnforcerId) -> Duration {
        let attempt = {
            let mut failures = self.failures.entry(id.clone()).or_insert(0);
            *failures = failures.saturating_add(1);
            *failures
        };

        let base = self.base_delay_ms(attempt);
        let delay = if self.config.jitter && base > 1 {
            rand::thread_rng().gen_range(base / 2..=base)
        } else {
            base
        };

        Duration::from_millis(delay)
    }

    /// Forget the failure history of `id`
    pub fn reset(&self, id: &EnforcerId) {
        self.failures.remove(id);
    }

    /// Consecutive failures recorded for `id`
    pub fn failures(&self, id: &EnforcerId) -> u32 {
        self.failures.get(id).map(|f| *f).unwrap_or(0)
    }

    fn base_delay_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let scaled = self.config.initial_delay_ms as f64 * self.config.multiplier.max(1.0).powi(exponent);
        let capped = scaled.min(self.config.max_delay_ms as f64);
        capped.max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(jitter: bool) -> BackoffPolicy {
        BackoffPolicy::new(BackoffConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2.0,
            jitter,
        })
    }

    #[test]
    fn test_delays_grow_and_cap() {
        let backoff = policy(false);
        let id = EnforcerId::new("ops", "a");

        let delays: Vec<u64> = (0..6)
            .map(|_| backoff.next_delay(&id).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
        assert_eq!(backoff.failures(&id), 6);
    }

    #[test]
    fn test_reset_starts_over() {
        let backoff = policy(false);
        let id = EnforcerId::new("ops", "a");
        backoff.next_delay(&id);
        backoff.next_delay(&id);

        backoff.reset(&id);
        assert_eq!(backoff.failures(&id), 0);
        assert_eq!(backoff.next_delay(&id), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let backoff = policy(true);
        for i in 0..50 {
            let id = EnforcerId::new("ops", format!("e{}", i));
            let delay = backoff.next_delay(&id).as_millis() as u64;
            assert!((50..=100).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn test_identities_are_independent() {
        let backoff = policy(false);
        let a = EnforcerId::new("ops", "a");
        let b = EnforcerId::new("ops", "b");
        backoff.next_delay(&a);
        backoff.next_delay(&a);
        assert_eq!(backoff.next_delay(&b), Duration::from_millis(100));
    }
}
