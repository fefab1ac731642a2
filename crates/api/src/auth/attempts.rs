//! Login attempt tracking and temporary lockout
//!
//! Failure counters live in a concurrent map keyed by username. Each counter
//! expires `lockout` after its last write, so a lockout heals on its own.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::MAX_TIME_WINDOW;

#[derive(Debug, Clone, Copy)]
struct FailureCounter {
    count: u32,
    expires_at: Instant,
}

impl FailureCounter {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct LoginAttemptTracker {
    counters: DashMap<String, FailureCounter>,
    max_attempts: u32,
    lockout: Duration,
}

impl LoginAttemptTracker {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            counters: DashMap::new(),
            max_attempts,
            lockout: lockout.min(MAX_TIME_WINDOW),
        }
    }

    /// True iff the live failure count for `username` has reached the threshold.
    pub fn is_blocked(&self, username: &str) -> bool {
        self.failure_count(username) >= self.max_attempts
    }

    /// Current failure count; unknown or expired counters read as zero.
    pub fn failure_count(&self, username: &str) -> u32 {
        let now = Instant::now();
        let live = self
            .counters
            .get(username)
            .map(|counter| (!counter.is_expired(now)).then_some(counter.count));

        match live {
            Some(Some(count)) => count,
            Some(None) => {
                // Guard from `get` is dropped above; removing here cannot deadlock.
                self.counters
                    .remove_if(username, |_, counter| counter.is_expired(now));
                0
            }
            None => 0,
        }
    }

    /// Increment the failure count under the shard lock.
    pub fn record_failure(&self, username: &str) {
        let now = Instant::now();
        let expires_at = now + self.lockout;

        let entry = self
            .counters
            .entry(username.to_string())
            .and_modify(|counter| {
                if counter.is_expired(now) {
                    counter.count = 1;
                } else {
                    counter.count = counter.count.saturating_add(1);
                }
                counter.expires_at = expires_at;
            })
            .or_insert(FailureCounter {
                count: 1,
                expires_at,
            });
        let count = entry.count;
        drop(entry);

        if count == self.max_attempts {
            tracing::warn!(
                username = %username,
                lockout_secs = self.lockout.as_secs(),
                "Login locked after repeated failures"
            );
        } else {
            tracing::debug!(username = %username, failures = count, "Login failure recorded");
        }
    }

    pub fn record_success(&self, username: &str) {
        self.counters.remove(username);
    }

    /// Drop every expired counter; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| !counter.is_expired(now));
        before.saturating_sub(self.counters.len())
    }
}
