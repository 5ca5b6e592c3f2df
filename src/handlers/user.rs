// src/handlers/user.rs

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    services::user,
    store::SharedStore,
    utils::{extract::AppPath, jwt::Claims},
};

/// Public user directory. Password hashes never leave the store.
pub async fn list_users(State(store): State<SharedStore>) -> Result<impl IntoResponse, AppError> {
    let users = user::list_users(store.as_ref()).await?;
    Ok(Json(json!({ "users": users })))
}

/// Profile of the authenticated caller.
pub async fn me(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = user::current_user(store.as_ref(), claims.user_id()?).await?;
    Ok(Json(json!({ "user": user })))
}

pub async fn find_user(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppPath(user_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = user::find_user(store.as_ref(), claims.user_id()?, user_id).await?;
    Ok(Json(json!({ "user": user })))
}
