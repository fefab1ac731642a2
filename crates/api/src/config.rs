//! Configuration loaded from the environment

use std::time::Duration;

use anyhow::{bail, Context};

use crate::auth::MAX_TIME_WINDOW;

/// Minimum signing secret length in bytes for HS256
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct Config {
    pub bind_address: String,
    /// Postgres URL; the in-memory identity store is used when unset
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_ms: u64,
    pub blacklist_retention_hours: u64,
    pub max_login_attempts: u32,
    pub lockout_duration_minutes: u64,
    pub sweep_interval_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("database_url", &self.database_url.as_ref().map(|_| "[redacted]"))
            .field("jwt_secret", &"[redacted]")
            .field("jwt_expiration_ms", &self.jwt_expiration_ms)
            .field("blacklist_retention_hours", &self.blacklist_retention_hours)
            .field("max_login_attempts", &self.max_login_attempts)
            .field("lockout_duration_minutes", &self.lockout_duration_minutes)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            database_url: None,
            jwt_secret: String::new(),
            jwt_expiration_ms: 3_600_000,
            blacklist_retention_hours: 24,
            max_login_attempts: 3,
            lockout_duration_minutes: 5,
            sweep_interval_secs: 60,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expiration_ms: env_or("JWT_EXPIRATION_MS", defaults.jwt_expiration_ms)?,
            blacklist_retention_hours: env_or(
                "TOKEN_BLACKLIST_RETENTION_HOURS",
                defaults.blacklist_retention_hours,
            )?,
            max_login_attempts: env_or("MAX_LOGIN_ATTEMPTS", defaults.max_login_attempts)?,
            lockout_duration_minutes: env_or(
                "LOCKOUT_DURATION_MINUTES",
                defaults.lockout_duration_minutes,
            )?,
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes");
        }
        if self.jwt_expiration_ms < 1_000 {
            bail!("JWT_EXPIRATION_MS must be at least 1000");
        }
        if self.max_login_attempts == 0 {
            bail!("MAX_LOGIN_ATTEMPTS must be at least 1");
        }
        if self.lockout_duration_minutes == 0 {
            bail!("LOCKOUT_DURATION_MINUTES must be at least 1");
        }
        if self.sweep_interval_secs == 0 {
            bail!("SWEEP_INTERVAL_SECS must be at least 1");
        }
        let max_days = MAX_TIME_WINDOW.as_secs() / 86_400;
        if self.token_expiration() > MAX_TIME_WINDOW {
            bail!("JWT_EXPIRATION_MS must not exceed {max_days} days");
        }
        if self.lockout_duration() > MAX_TIME_WINDOW {
            bail!("LOCKOUT_DURATION_MINUTES must not exceed {max_days} days");
        }
        if self.blacklist_retention() > MAX_TIME_WINDOW {
            bail!("TOKEN_BLACKLIST_RETENTION_HOURS must not exceed {max_days} days");
        }
        if self.blacklist_retention() < self.token_expiration() {
            bail!(
                "TOKEN_BLACKLIST_RETENTION_HOURS ({}h) must cover the token lifetime ({}ms)",
                self.blacklist_retention_hours,
                self.jwt_expiration_ms
            );
        }
        Ok(())
    }

    pub fn token_expiration(&self) -> Duration {
        Duration::from_millis(self.jwt_expiration_ms)
    }

    pub fn blacklist_retention(&self) -> Duration {
        Duration::from_secs(self.blacklist_retention_hours.saturating_mul(3600))
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::from_secs(self.lockout_duration_minutes.saturating_mul(60))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
