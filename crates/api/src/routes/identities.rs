//! Trainee/trainer registration and profile routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    auth::AuthContext,
    error::ApiResult,
    state::AppState,
    store::{Identity, IdentityKind},
};

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub first_name: String,
    pub last_name: String,
}

/// Generated credentials, shown to the registrar exactly once
#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub kind: IdentityKind,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Identity> for ProfileResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username,
            first_name: identity.first_name,
            last_name: identity.last_name,
            is_active: identity.is_active,
            kind: identity.kind,
            created_at: identity.created_at,
        }
    }
}

async fn register(
    state: &AppState,
    req: RegistrationRequest,
    kind: IdentityKind,
) -> ApiResult<(StatusCode, Json<RegistrationResponse>)> {
    let (identity, password) = state
        .gateway
        .provision_identity(&req.first_name, &req.last_name, kind)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            username: identity.username,
            password,
        }),
    ))
}

pub async fn register_trainee(
    State(state): State<AppState>,
    Json(req): Json<RegistrationRequest>,
) -> ApiResult<(StatusCode, Json<RegistrationResponse>)> {
    register(&state, req, IdentityKind::Trainee).await
}

pub async fn register_trainer(
    State(state): State<AppState>,
    Json(req): Json<RegistrationRequest>,
) -> ApiResult<(StatusCode, Json<RegistrationResponse>)> {
    register(&state, req, IdentityKind::Trainer).await
}

pub async fn me(
    State(state): State<AppState>,
    acting: AuthContext,
) -> ApiResult<Json<ProfileResponse>> {
    let identity = state.gateway.profile(&acting).await?;
    Ok(Json(identity.into()))
}

pub async fn deactivate(
    State(state): State<AppState>,
    acting: AuthContext,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    state.gateway.deactivate(&acting, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}
