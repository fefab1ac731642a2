//! HTTP routes

use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};

use crate::{auth, state::AppState};

pub mod identities;
pub mod sessions;


/// Build the API router. Every request passes through `request_timing`, then
/// the bearer-token authenticator, then the handler.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(sessions::login))
        .route("/auth/logout", post(sessions::logout))
        .route("/auth/password", put(sessions::change_password))
        .route("/trainees", post(identities::register_trainee))
        .route("/trainers", post(identities::register_trainer))
        .route("/me", get(identities::me))
        .route(
            "/identities/{username}/deactivate",
            post(identities::deactivate),
        );

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            auth::authenticate,
        ))
        .layer(middleware::from_fn(request_timing))
        .with_state(state)
}

/// Log method, path, status and latency for every request
pub async fn request_timing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}
