//! Bearer-token authentication middleware for Axum

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{
    attempts::LoginAttemptTracker,
    blacklist::TokenBlacklist,
    jwt::{token_prefix, TokenCodec},
    AuthContext,
};
use crate::{
    error::{ApiError, ApiResult},
    store::IdentityStore,
};

pub const TOKEN_REVOKED: &str = "Invalid or expired token";

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves a bearer token to a caller identity. Performs no writes.
#[derive(Clone)]
pub struct RequestAuthenticator {
    store: Arc<dyn IdentityStore>,
    codec: Arc<TokenCodec>,
    blacklist: Arc<TokenBlacklist>,
    attempts: Arc<LoginAttemptTracker>,
}

impl RequestAuthenticator {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        codec: Arc<TokenCodec>,
        blacklist: Arc<TokenBlacklist>,
        attempts: Arc<LoginAttemptTracker>,
    ) -> Self {
        Self {
            store,
            codec,
            blacklist,
            attempts,
        }
    }

    /// `Ok(None)` leaves the request unauthenticated; downstream handlers decide
    /// whether that is acceptable. Only a revoked token is rejected outright.
    pub async fn authenticate(&self, bearer: Option<&str>) -> ApiResult<Option<AuthContext>> {
        let Some(token) = bearer else {
            return Ok(None);
        };

        if self.blacklist.is_blacklisted(Some(token)) {
            tracing::warn!(token_prefix = %token_prefix(token), "Rejected revoked token");
            return Err(ApiError::Unauthorized(TOKEN_REVOKED));
        }

        let Ok(claims) = self.codec.claims(token) else {
            tracing::debug!(token_prefix = %token_prefix(token), "Bearer token did not decode");
            return Ok(None);
        };

        let Some(identity) = self.store.find_by_username(&claims.username).await? else {
            tracing::debug!(username = %claims.username, "Token subject no longer exists");
            return Ok(None);
        };

        // A recreated identity with the same username must not inherit old tokens
        let same_subject = claims.sub == identity.id.to_string();
        let enabled = identity.is_active && !self.attempts.is_blocked(&identity.username);

        if same_subject && enabled && self.codec.validate(token) {
            Ok(Some(AuthContext {
                identity_id: identity.id,
                username: identity.username,
                token: token.to_string(),
            }))
        } else {
            tracing::debug!(
                username = %claims.username,
                same_subject,
                enabled,
                "Bearer token not accepted"
            );
            Ok(None)
        }
    }
}

/// Runs once per request before any handler.
pub async fn authenticate(
    State(authenticator): State<RequestAuthenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers()).map(str::to_owned);

    match authenticator.authenticate(token.as_deref()).await {
        Ok(Some(context)) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(err) => {
            tracing::warn!(path = %request.uri().path(), error = %err, "authenticate: request rejected");
            err.into_response()
        }
    }
}
