//! Shared fixtures for auth tests

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use super::{
    AuthenticationGateway, LoginAttemptTracker, PasswordError, PasswordHasher,
    RequestAuthenticator, TokenBlacklist, TokenCodec,
};
use crate::{
    metrics::AuthMetrics,
    store::{Identity, IdentityKind, IdentityStore, MemoryIdentityStore, NewIdentity},
};

pub const TEST_SECRET: &str = "test-jwt-secret-key-for-testing-only";

/// Cheap reversible "hash" that counts verify calls.
#[derive(Default)]
pub struct CountingHasher {
    verifications: AtomicUsize,
}

impl CountingHasher {
    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }
}

impl PasswordHasher for CountingHasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        Ok(format!("plain:{plaintext}"))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        digest.strip_prefix("plain:") == Some(plaintext)
    }
}

pub struct TestAuth {
    pub store: Arc<MemoryIdentityStore>,
    pub hasher: Arc<CountingHasher>,
    pub codec: Arc<TokenCodec>,
    pub attempts: Arc<LoginAttemptTracker>,
    pub blacklist: Arc<TokenBlacklist>,
    pub metrics: Arc<AuthMetrics>,
    pub gateway: AuthenticationGateway,
    pub authenticator: RequestAuthenticator,
}

impl TestAuth {
    pub fn new(max_attempts: u32) -> Self {
        let store = Arc::new(MemoryIdentityStore::new());
        let hasher = Arc::new(CountingHasher::default());
        let codec = Arc::new(TokenCodec::new(TEST_SECRET, Duration::from_secs(3600)));
        let attempts = Arc::new(LoginAttemptTracker::new(
            max_attempts,
            Duration::from_secs(300),
        ));
        let blacklist = Arc::new(TokenBlacklist::new(Duration::from_secs(24 * 3600)));
        let metrics = Arc::new(AuthMetrics::new().unwrap());

        let gateway = AuthenticationGateway::new(
            store.clone(),
            hasher.clone(),
            codec.clone(),
            attempts.clone(),
            blacklist.clone(),
            metrics.clone(),
        )
        .unwrap();
        let authenticator = RequestAuthenticator::new(
            store.clone(),
            codec.clone(),
            blacklist.clone(),
            attempts.clone(),
        );

        Self {
            store,
            hasher,
            codec,
            attempts,
            blacklist,
            metrics,
            gateway,
            authenticator,
        }
    }

    pub async fn seed(&self, username: &str, password: &str, is_active: bool) -> Identity {
        self.store
            .insert(NewIdentity {
                username: username.to_string(),
                password_hash: format!("plain:{password}"),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                is_active,
                kind: IdentityKind::Trainee,
            })
            .await
            .unwrap()
    }

    pub async fn stored(&self, username: &str) -> Identity {
        self.store
            .find_by_username(username)
            .await
            .unwrap()
            .unwrap()
    }
}
