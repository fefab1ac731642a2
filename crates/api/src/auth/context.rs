//! Request-scoped caller identity
//!
//! The authenticator inserts an [`AuthContext`] into request extensions; handlers
//! receive it as an explicit argument. Nothing about the caller is stored in
//! global or thread-local state.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const AUTH_REQUIRED: &str = "Authentication required";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub identity_id: i64,
    pub username: String,
    /// The bearer token that authenticated this request
    pub token: String,
}

/// The single ownership check: the caller may only act on its own identity.
pub fn assert_acting_as(context: &AuthContext, target_username: &str) -> Result<(), ApiError> {
    if context.username == target_username {
        return Ok(());
    }
    tracing::warn!(
        acting = %context.username,
        target = %target_username,
        "Caller attempted to act on another identity"
    );
    Err(ApiError::Forbidden)
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(ApiError::Unauthorized(AUTH_REQUIRED))
    }
}
