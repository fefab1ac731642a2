//! Revoked-token set for logout
//!
//! Entries are forgotten after `retention`. Retention must cover the longest
//! token lifetime, otherwise a revoked token could become usable again before
//! it expires naturally.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::MAX_TIME_WINDOW;

pub struct TokenBlacklist {
    entries: DashMap<String, Instant>,
    retention: Duration,
}

impl TokenBlacklist {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention: retention.min(MAX_TIME_WINDOW),
        }
    }

    /// Revoke `token`. Missing or empty tokens are ignored.
    pub fn blacklist(&self, token: Option<&str>) {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return;
        };
        self.entries
            .insert(token.to_string(), Instant::now() + self.retention);
        tracing::debug!(
            retention_secs = self.retention.as_secs(),
            entries = self.entries.len(),
            "Token added to blacklist"
        );
    }

    pub fn is_blacklisted(&self, token: Option<&str>) -> bool {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return false;
        };

        let now = Instant::now();
        let expired = match self.entries.get(token) {
            Some(expires_at) => now >= *expires_at,
            None => return false,
        };

        if expired {
            self.entries.remove_if(token, |_, expires_at| now >= *expires_at);
            return false;
        }
        true
    }

    /// Drop every entry past its retention; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| now < *expires_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
