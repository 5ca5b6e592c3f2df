//! Sign-up and sign-in. Both hand back a signed token.

use crate::{
    config::Config,
    error::AppError,
    models::user::{NewUser, SignInRequest, SignUpRequest},
    store::Store,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

fn invalid_credentials() -> AppError {
    AppError::AuthError("Invalid email or password.".to_string())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
pub async fn sign_up(
    store: &dyn Store,
    config: &Config,
    request: SignUpRequest,
) -> Result<String, AppError> {
    let email = normalize_email(&request.email);
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists.".to_string()));
    }

    let user = store
        .insert_user(NewUser {
            name: request.name.trim().to_string(),
            email,
            password_hash: hash_password(&request.password)?,
        })
        .await?;
    tracing::info!("Registered user {}", user.id);

    sign_jwt(
        user.id,
        &user.name,
        &user.email,
        &config.jwt_secret,
        config.jwt_expiration,
    )
}

/// Authenticates a user by email and password.
/// Unknown emails and wrong passwords get the same answer.
pub async fn sign_in(
    store: &dyn Store,
    config: &Config,
    request: SignInRequest,
) -> Result<String, AppError> {
    let credentials = store
        .find_credentials(&normalize_email(&request.email))
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&request.password, &credentials.password_hash)? {
        return Err(invalid_credentials());
    }

    sign_jwt(
        credentials.id,
        &credentials.name,
        &credentials.email,
        &config.jwt_secret,
        config.jwt_expiration,
    )
}
