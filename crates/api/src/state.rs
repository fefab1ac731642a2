//! Application state

use std::sync::Arc;

use crate::{
    auth::{
        Argon2Hasher, AuthenticationGateway, LoginAttemptTracker, PasswordHasher,
        RequestAuthenticator, TokenBlacklist, TokenCodec,
    },
    config::Config,
    metrics::AuthMetrics,
    store::{IdentityStore, MemoryIdentityStore, PgIdentityStore},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: AuthenticationGateway,
    pub authenticator: RequestAuthenticator,
    pub blacklist: Arc<TokenBlacklist>,
    pub attempts: Arc<LoginAttemptTracker>,
    pub metrics: Arc<AuthMetrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn IdentityStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> anyhow::Result<Self> {
        let codec = Arc::new(TokenCodec::new(
            &config.jwt_secret,
            config.token_expiration(),
        ));
        let blacklist = Arc::new(TokenBlacklist::new(config.blacklist_retention()));
        let attempts = Arc::new(LoginAttemptTracker::new(
            config.max_login_attempts,
            config.lockout_duration(),
        ));
        let metrics = Arc::new(AuthMetrics::new()?);

        let gateway = AuthenticationGateway::new(
            store.clone(),
            hasher,
            codec.clone(),
            attempts.clone(),
            blacklist.clone(),
            metrics.clone(),
        )?;
        let authenticator =
            RequestAuthenticator::new(store, codec, blacklist.clone(), attempts.clone());

        tracing::info!(
            token_expiration_ms = config.jwt_expiration_ms,
            blacklist_retention_hours = config.blacklist_retention_hours,
            max_login_attempts = config.max_login_attempts,
            lockout_duration_minutes = config.lockout_duration_minutes,
            "Authentication initialized"
        );

        Ok(Self {
            config,
            gateway,
            authenticator,
            blacklist,
            attempts,
            metrics,
        })
    }

    /// Build state from config, connecting to Postgres when `DATABASE_URL` is set
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn IdentityStore> = match &config.database_url {
            Some(url) => {
                tracing::info!("Connecting to database...");
                let store = PgIdentityStore::connect(url).await?;
                tracing::info!("Database connection established");
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, identities are kept in memory");
                Arc::new(MemoryIdentityStore::new())
            }
        };

        Self::new(config, store, Arc::new(Argon2Hasher::new()))
    }

    /// Periodically drop expired blacklist entries and failure counters.
    /// Reads already ignore expired entries; this only bounds memory.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let blacklist = self.blacklist.clone();
        let attempts = self.attempts.clone();
        let period = self.config.sweep_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let revoked = blacklist.purge_expired();
                let counters = attempts.purge_expired();
                if revoked > 0 || counters > 0 {
                    tracing::debug!(
                        blacklist_evicted = revoked,
                        counters_evicted = counters,
                        "Expired auth entries swept"
                    );
                }
            }
        })
    }
}
