use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        comment::{CommentPage, CommentTreeResponse, CreateCommentRequest, UpdateCommentRequest},
        post::SearchParams,
    },
    services::comment,
    store::SharedStore,
    utils::{
        extract::{AppJson, AppPath, AppQuery},
        jwt::Claims,
        pagination::{PageParams, RequestUrl},
    },
};

/// Add a comment or a reply. Replies nested too deep are re-parented.
pub async fn create_comment(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment = comment::create_comment(store.as_ref(), claims.user_id()?, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn search_comments(
    State(store): State<SharedStore>,
    AppQuery(search): AppQuery<SearchParams>,
    AppQuery(page): AppQuery<PageParams>,
    url: RequestUrl,
) -> Result<impl IntoResponse, AppError> {
    let paged = comment::search_comments(store.as_ref(), search, page.resolve()?).await?;
    let meta = paged.meta(&url);
    Ok(Json(CommentPage {
        meta,
        comments: paged.items,
    }))
}

/// All comments of a post as a tree.
pub async fn post_comments(
    State(store): State<SharedStore>,
    AppPath(post_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comments = comment::post_comments(store.as_ref(), post_id).await?;
    Ok(Json(CommentTreeResponse { comments }))
}

pub async fn get_comment(
    State(store): State<SharedStore>,
    AppPath(comment_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(comment::get_comment(store.as_ref(), comment_id).await?))
}

pub async fn update_comment(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppPath(comment_id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment =
        comment::update_comment(store.as_ref(), claims.user_id()?, comment_id, payload).await?;
    Ok(Json(comment))
}

/// Delete a comment together with every reply below it.
pub async fn delete_comment(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppPath(comment_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    comment::delete_comment(store.as_ref(), claims.user_id()?, comment_id).await?;
    Ok(Json(serde_json::json!({ "message": "Comment deleted successfully" })))
}
