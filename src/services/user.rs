use crate::{
    error::AppError,
    models::user::User,
    services::ensure_owner,
    store::Store,
};

pub async fn list_users(store: &dyn Store) -> Result<Vec<User>, AppError> {
    store.list_users().await
}

pub async fn current_user(store: &dyn Store, user_id: i64) -> Result<User, AppError> {
    store
        .find_user(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found.".to_string()))
}

/// Looks up `user_id`; callers may only look themselves up.
pub async fn find_user(store: &dyn Store, caller_id: i64, user_id: i64) -> Result<User, AppError> {
    let user = current_user(store, user_id).await?;
    ensure_owner(user.id, caller_id)?;
    Ok(user)
}
