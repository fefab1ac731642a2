//! Login, logout, password change and identity provisioning
//!
//! Login state machine:
//!
//! ```text
//! start -> locked?            -> Rejected(Locked)          (no verify, no new failure)
//!       -> password mismatch  -> Rejected(BadCredentials)  (failure recorded)
//!       -> identity inactive  -> Rejected(Inactive)        (nothing recorded)
//!       -> Authenticated      -> counter cleared, token issued
//! ```
//!
//! Unknown usernames take the mismatch path, including a verification against a
//! dummy digest, so they cannot be told apart from a wrong password.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;

use super::{
    assert_acting_as,
    attempts::LoginAttemptTracker,
    blacklist::TokenBlacklist,
    credentials,
    jwt::{token_prefix, TokenCodec},
    password::{PasswordError, PasswordHasher},
    AuthContext,
};
use crate::{
    error::{ApiError, ApiResult},
    metrics::LoginMetrics,
    store::{Identity, IdentityKind, IdentityStore, NewIdentity},
};

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const ACCOUNT_LOCKED: &str = "Account temporarily locked. Try again later.";

/// Why a login was refused. Only used for logging; clients see
/// [`LoginRejection::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRejection {
    BadCredentials,
    Inactive,
    Locked,
}

impl LoginRejection {
    pub fn message(self) -> &'static str {
        match self {
            LoginRejection::BadCredentials | LoginRejection::Inactive => INVALID_CREDENTIALS,
            LoginRejection::Locked => ACCOUNT_LOCKED,
        }
    }
}

impl From<LoginRejection> for ApiError {
    fn from(rejection: LoginRejection) -> Self {
        ApiError::Unauthorized(rejection.message())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub username: String,
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthenticationGateway {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn PasswordHasher>,
    codec: Arc<TokenCodec>,
    attempts: Arc<LoginAttemptTracker>,
    blacklist: Arc<TokenBlacklist>,
    metrics: Arc<dyn LoginMetrics>,
    /// Verified against when the username does not exist
    dummy_digest: Arc<str>,
}

impl AuthenticationGateway {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        hasher: Arc<dyn PasswordHasher>,
        codec: Arc<TokenCodec>,
        attempts: Arc<LoginAttemptTracker>,
        blacklist: Arc<TokenBlacklist>,
        metrics: Arc<dyn LoginMetrics>,
    ) -> Result<Self, PasswordError> {
        let dummy_digest = hasher.hash(&credentials::random_password())?;
        Ok(Self {
            store,
            hasher,
            codec,
            attempts,
            blacklist,
            metrics,
            dummy_digest: dummy_digest.into(),
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginOutcome> {
        match self.attempt_login(username, password).await {
            Ok(outcome) => {
                self.metrics.record_login_success();
                tracing::info!(username = %outcome.username, "Login succeeded");
                Ok(outcome)
            }
            Err(err) => {
                self.metrics.record_login_failure();
                Err(err)
            }
        }
    }

    async fn attempt_login(&self, username: &str, password: &str) -> ApiResult<LoginOutcome> {
        if self.attempts.is_blocked(username) {
            tracing::warn!(username = %username, "Login rejected: account locked");
            return Err(LoginRejection::Locked.into());
        }

        let identity = self.store.find_by_username(username).await?;
        let digest = identity
            .as_ref()
            .map(|identity| identity.password_hash.clone())
            .unwrap_or_else(|| self.dummy_digest.to_string());

        let verified = self.verify_password(password, digest).await?;
        let identity = match identity {
            Some(identity) if verified => identity,
            _ => {
                self.attempts.record_failure(username);
                tracing::warn!(username = %username, "Login rejected: bad credentials");
                return Err(LoginRejection::BadCredentials.into());
            }
        };

        if !identity.is_active {
            tracing::warn!(username = %username, "Login rejected: identity inactive");
            return Err(LoginRejection::Inactive.into());
        }

        self.attempts.record_success(username);
        let issued = self
            .codec
            .issue(identity.id, &identity.username, OffsetDateTime::now_utc())
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(LoginOutcome {
            username: identity.username,
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Revoke `token` for the rest of the blacklist retention window.
    ///
    /// Only tokens carrying our signature are stored; anything else can never
    /// authenticate and is ignored.
    pub fn logout(&self, token: Option<&str>) {
        match token {
            Some(token) if !token.is_empty() => {
                if self.codec.claims(token).is_err() {
                    tracing::debug!(token_prefix = %token_prefix(token), "Logout with unsigned token ignored");
                    return;
                }
                self.blacklist.blacklist(Some(token));
                tracing::info!(token_prefix = %token_prefix(token), "Logged out");
            }
            _ => tracing::debug!("Logout without token, nothing to revoke"),
        }
    }

    pub async fn change_password(
        &self,
        acting: &AuthContext,
        target_username: &str,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        assert_acting_as(acting, target_username)?;

        let identity = self
            .store
            .find_by_username(target_username)
            .await?
            .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))?;

        if !self
            .verify_password(old_password, identity.password_hash.clone())
            .await?
        {
            tracing::warn!(username = %target_username, "Password change rejected: old password mismatch");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
        }

        if new_password.is_empty() {
            return Err(ApiError::Validation("New password must not be empty".into()));
        }
        if new_password == old_password {
            return Err(ApiError::Validation(
                "New password must differ from the old password".into(),
            ));
        }

        let digest = self.hash_password(new_password).await?;
        self.store.update_password(identity.id, &digest).await?;
        tracing::info!(username = %target_username, "Password changed");
        Ok(())
    }

    /// Register a new active identity; the plaintext password is returned once.
    pub async fn provision_identity(
        &self,
        first_name: &str,
        last_name: &str,
        kind: IdentityKind,
    ) -> ApiResult<(Identity, String)> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(ApiError::Validation(
                "First and last name are required".into(),
            ));
        }

        let username = credentials::unique_username(self.store.as_ref(), first_name, last_name)
            .await?;
        let raw_password = credentials::random_password();
        let password_hash = self.hash_password(&raw_password).await?;

        let identity = self
            .store
            .insert(NewIdentity {
                username,
                password_hash,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                is_active: true,
                kind,
            })
            .await?;

        tracing::info!(
            identity_id = identity.id,
            username = %identity.username,
            kind = kind.as_str(),
            "Identity provisioned"
        );
        Ok((identity, raw_password))
    }

    pub async fn profile(&self, acting: &AuthContext) -> ApiResult<Identity> {
        self.store
            .find_by_id(acting.identity_id)
            .await?
            .ok_or(ApiError::NotFound)
    }

    /// Self-service deactivation. An inactive identity can no longer log in or
    /// authenticate, so there is no matching self-service reactivation.
    pub async fn deactivate(&self, acting: &AuthContext, target_username: &str) -> ApiResult<()> {
        assert_acting_as(acting, target_username)?;

        let identity = self
            .store
            .find_by_username(target_username)
            .await?
            .ok_or(ApiError::NotFound)?;
        self.store.set_active(identity.id, false).await?;
        tracing::info!(username = %target_username, "Identity deactivated");
        Ok(())
    }

    async fn verify_password(&self, password: &str, digest: String) -> ApiResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| ApiError::Internal(format!("password verification task failed: {e}")))
    }

    async fn hash_password(&self, password: &str) -> ApiResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}
