use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    models::post::{CreatePostRequest, PostPage, SearchParams, UpdatePostRequest},
    services::post,
    store::SharedStore,
    utils::{
        extract::{AppJson, AppPath, AppQuery},
        jwt::Claims,
        pagination::{PageParams, Paged, RequestUrl},
    },
};

fn page_body<T: serde::Serialize>(paged: Paged<T>, url: &RequestUrl) -> Json<PostPage<T>> {
    let meta = paged.meta(url);
    Json(PostPage {
        meta,
        posts: paged.items,
    })
}

/// Create a new post owned by the caller.
pub async fn create_post(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let post = post::create_post(store.as_ref(), claims.user_id()?, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// List posts, newest first, with author names.
pub async fn list_posts(
    State(store): State<SharedStore>,
    AppQuery(page): AppQuery<PageParams>,
    url: RequestUrl,
) -> Result<impl IntoResponse, AppError> {
    let paged = post::list_posts(store.as_ref(), page.resolve()?).await?;
    Ok(page_body(paged, &url))
}

/// Search posts by title or content.
pub async fn search_posts(
    State(store): State<SharedStore>,
    AppQuery(search): AppQuery<SearchParams>,
    AppQuery(page): AppQuery<PageParams>,
    url: RequestUrl,
) -> Result<impl IntoResponse, AppError> {
    let paged = post::search_posts(store.as_ref(), search, page.resolve()?).await?;
    Ok(page_body(paged, &url))
}

/// List the caller's own posts.
pub async fn list_my_posts(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppQuery(page): AppQuery<PageParams>,
    url: RequestUrl,
) -> Result<impl IntoResponse, AppError> {
    let paged = post::list_my_posts(store.as_ref(), claims.user_id()?, page.resolve()?).await?;
    Ok(page_body(paged, &url))
}

#[derive(Debug, Deserialize)]
pub struct TitleParams {
    pub title: Option<String>,
}

/// Search the caller's own posts by title.
pub async fn search_my_posts(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppQuery(search): AppQuery<TitleParams>,
    AppQuery(page): AppQuery<PageParams>,
    url: RequestUrl,
) -> Result<impl IntoResponse, AppError> {
    let paged = post::search_my_posts(
        store.as_ref(),
        claims.user_id()?,
        search.title,
        page.resolve()?,
    )
    .await?;
    Ok(page_body(paged, &url))
}

/// Get a single post by ID.
pub async fn get_post(
    State(store): State<SharedStore>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(post::get_post(store.as_ref(), id).await?))
}

/// Update a post. Author only; blank fields are ignored.
pub async fn update_post(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let post = post::update_post(store.as_ref(), claims.user_id()?, id, payload).await?;
    Ok(Json(post))
}

/// Delete a post and its comments. Author only.
pub async fn delete_post(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    post::delete_post(store.as_ref(), claims.user_id()?, id).await?;
    Ok(Json(serde_json::json!({ "message": "Post deleted successfully" })))
}

/// Page of posts, each with its nested comments.
pub async fn list_post_threads(
    State(store): State<SharedStore>,
    AppQuery(page): AppQuery<PageParams>,
    url: RequestUrl,
) -> Result<impl IntoResponse, AppError> {
    let paged = post::list_post_threads(store.as_ref(), page.resolve()?).await?;
    Ok(page_body(paged, &url))
}

/// Search posts and include their nested comments.
pub async fn search_post_threads(
    State(store): State<SharedStore>,
    AppQuery(search): AppQuery<SearchParams>,
    AppQuery(page): AppQuery<PageParams>,
    url: RequestUrl,
) -> Result<impl IntoResponse, AppError> {
    let paged = post::search_post_threads(store.as_ref(), search, page.resolve()?).await?;
    Ok(page_body(paged, &url))
}

/// A user's posts with nested comments. Only that user may ask.
pub async fn list_user_post_threads(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppPath(user_id): AppPath<i64>,
    AppQuery(page): AppQuery<PageParams>,
    url: RequestUrl,
) -> Result<impl IntoResponse, AppError> {
    let paged = post::list_user_post_threads(
        store.as_ref(),
        claims.user_id()?,
        user_id,
        page.resolve()?,
    )
    .await?;
    Ok(page_body(paged, &url))
}

/// One post with its nested comments.
pub async fn get_post_thread(
    State(store): State<SharedStore>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(post::get_post_thread(store.as_ref(), id).await?))
}
