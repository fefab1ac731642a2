//! Login, logout and password change routes

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use crate::{
    auth::{bearer_token, AuthContext, LoginOutcome},
    error::ApiResult,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub username: String,
    pub old_password: String,
    pub new_password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginOutcome>> {
    let outcome = state.gateway.login(&req.username, &req.password).await?;
    Ok(Json(outcome))
}

/// Always succeeds; a request without a token has nothing to revoke
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    state.gateway.logout(bearer_token(&headers));
    StatusCode::NO_CONTENT
}

pub async fn change_password(
    State(state): State<AppState>,
    acting: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    state
        .gateway
        .change_password(&acting, &req.username, &req.old_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
