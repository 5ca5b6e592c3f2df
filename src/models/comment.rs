use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::pagination::PageMeta;

/// Title given to a comment created without one.
pub const DEFAULT_REPLY_TITLE: &str = "reply";

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Row to insert; `parent_id` is the effective (possibly collapsed) parent.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
}

/// A comment with its replies, in creation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(rename = "subComments")]
    pub sub_comments: Vec<CommentNode>,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 255, message = "Title cannot be empty"))]
    pub title: Option<String>,

    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,

    #[serde(alias = "PostId")]
    pub post_id: i64,

    /// Optional: the ID of the comment being replied to.
    #[serde(default, alias = "ParentId")]
    pub parent_id: Option<i64>,
}

/// DTO for a partial comment update. Empty strings leave the field unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(max = 255, message = "Title cannot exceed 255 chars"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Comment cannot exceed 1000 characters"))]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentTreeResponse {
    pub comments: Vec<CommentNode>,
}

/// `{total, page, pageSize, nextPage, comments}`.
#[derive(Debug, Serialize)]
pub struct CommentPage {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub comments: Vec<Comment>,
}
