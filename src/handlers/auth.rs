// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{SignInRequest, SignUpRequest, TokenResponse},
    services::auth,
    store::SharedStore,
    utils::extract::AppJson,
};

/// Registers a new user and returns 201 with a token.
pub async fn sign_up(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    AppJson(payload): AppJson<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let token = auth::sign_up(store.as_ref(), &config, payload).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Authenticates a user and returns a JWT token.
pub async fn sign_in(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    AppJson(payload): AppJson<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let token = auth::sign_in(store.as_ref(), &config, payload).await?;
    Ok(Json(TokenResponse { token }))
}
