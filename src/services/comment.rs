use crate::{
    error::AppError,
    models::{
        comment::{
            Comment, CommentNode, CreateCommentRequest, DEFAULT_REPLY_TITLE, NewComment,
            UpdateCommentRequest,
        },
        post::{SearchParams, SearchTerms},
    },
    services::{
        ensure_owner, non_empty,
        thread::{MAX_DEPTH, build_tree, comment_depth},
    },
    store::Store,
    utils::pagination::{Paged, Pagination},
};

/// Creates a comment, collapsing replies that would sit deeper than
/// `MAX_DEPTH` onto their grandparent.
///
/// Checks run in order: post exists, parent exists, parent is on the same
/// post, parent depth. No transaction spans them.
pub async fn create_comment(
    store: &dyn Store,
    author_id: i64,
    request: CreateCommentRequest,
) -> Result<Comment, AppError> {
    if store.find_post(request.post_id).await?.is_none() {
        return Err(AppError::NotFound("Post not Found".to_string()));
    }

    let mut parent_id = request.parent_id;
    if let Some(requested) = request.parent_id {
        let parent = store.find_comment(requested).await?.ok_or_else(|| {
            AppError::BadRequest("You can't reply to a non-existing comment".to_string())
        })?;

        if parent.post_id != request.post_id {
            return Err(AppError::BadRequest(format!(
                "This comment is not on post {}",
                request.post_id
            )));
        }

        if comment_depth(store, requested).await? >= MAX_DEPTH {
            parent_id = parent.parent_id;
        }
    }

    let title = non_empty(request.title).unwrap_or_else(|| DEFAULT_REPLY_TITLE.to_string());
    let comment = store
        .insert_comment(NewComment {
            title,
            content: request.content,
            user_id: author_id,
            post_id: request.post_id,
            parent_id,
        })
        .await?;

    tracing::info!(
        "User {} commented {} on post {} (parent {:?})",
        author_id,
        comment.id,
        comment.post_id,
        comment.parent_id
    );
    Ok(comment)
}

pub async fn get_comment(store: &dyn Store, comment_id: i64) -> Result<Comment, AppError> {
    store
        .find_comment(comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment not Found".to_string()))
}

/// All comments of a post, nested.
pub async fn post_comments(store: &dyn Store, post_id: i64) -> Result<Vec<CommentNode>, AppError> {
    if store.find_post(post_id).await?.is_none() {
        return Err(AppError::NotFound("Post not Found".to_string()));
    }
    Ok(build_tree(store.comments_for_post(post_id).await?))
}

pub async fn update_comment(
    store: &dyn Store,
    caller_id: i64,
    comment_id: i64,
    request: UpdateCommentRequest,
) -> Result<Comment, AppError> {
    let mut comment = get_comment(store, comment_id).await?;
    if let Err(e) = ensure_owner(comment.user_id, caller_id) {
        tracing::warn!("User {} tried to edit comment {}", caller_id, comment_id);
        return Err(e);
    }

    if let Some(title) = non_empty(request.title) {
        comment.title = title;
    }
    if let Some(content) = non_empty(request.content) {
        comment.content = content;
    }

    store.update_comment(&comment).await
}

/// Deletes a comment and, through the store, all replies below it.
pub async fn delete_comment(store: &dyn Store, caller_id: i64, comment_id: i64) -> Result<(), AppError> {
    let comment = get_comment(store, comment_id).await?;
    if let Err(e) = ensure_owner(comment.user_id, caller_id) {
        tracing::warn!("User {} tried to delete comment {}", caller_id, comment_id);
        return Err(e);
    }

    if !store.delete_comment(comment_id).await? {
        return Err(AppError::NotFound("Comment not Found".to_string()));
    }
    tracing::info!("User {} deleted comment {}", caller_id, comment_id);
    Ok(())
}

/// Case-insensitive title/content search; at least one term is required.
pub async fn search_comments(
    store: &dyn Store,
    params: SearchParams,
    pagination: Pagination,
) -> Result<Paged<Comment>, AppError> {
    let terms = SearchTerms::new(params.title, params.content);
    if terms.is_empty() {
        return Err(AppError::BadRequest(
            "Title or content query parameter is required".to_string(),
        ));
    }

    let (items, total) = store.search_comments(&terms, pagination).await?;
    Ok(Paged {
        items,
        total,
        pagination,
    })
}
