use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{models::comment::CommentNode, utils::pagination::PageMeta};

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A post joined with its author's name, as shown in listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub user_id: i64,
    /// `None` only if the author row vanished under us.
    pub author: Option<String>,
    pub title: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl PostSummary {
    /// Listing date (`YYYY-MM-DD`) taken from the last update.
    pub fn date(&self) -> chrono::NaiveDate {
        self.updated_at.date_naive()
    }
}

/// Listing row as serialized to clients.
#[derive(Debug, Serialize)]
pub struct PostListItem {
    pub id: i64,
    pub author: Option<String>,
    pub title: String,
    pub content: String,
    pub date: chrono::NaiveDate,
}

impl From<PostSummary> for PostListItem {
    fn from(summary: PostSummary) -> Self {
        let date = summary.date();
        Self {
            id: summary.id,
            author: summary.author,
            title: summary.title,
            content: summary.content,
            date,
        }
    }
}

/// A post together with its assembled comment tree.
#[derive(Debug, Serialize)]
pub struct PostThread {
    #[serde(flatten)]
    pub post: PostSummary,
    pub comments: Vec<CommentNode>,
}

/// `{total, page, pageSize, nextPage, posts}`.
#[derive(Debug, Serialize)]
pub struct PostPage<T: Serialize> {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub posts: Vec<T>,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title length must be between 1 and 255 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 10000,
        message = "Content length must be between 1 and 10000 chars"
    ))]
    pub content: String,
}

/// DTO for a partial post update. Empty strings leave the field unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(max = 255, message = "Title cannot exceed 255 chars"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Content cannot exceed 10000 chars"))]
    pub content: Option<String>,
}

/// Filter for post listings. All set conditions are AND-ed, except the two
/// search terms which are OR-ed with each other.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub author_id: Option<i64>,
    pub terms: SearchTerms,
}

/// Case-insensitive substring terms. Blank terms are dropped; with no terms
/// left, every row matches.
#[derive(Debug, Clone, Default)]
pub struct SearchTerms {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl SearchTerms {
    /// Keeps only non-blank terms.
    pub fn new(title: Option<String>, content: Option<String>) -> Self {
        let keep = |t: Option<String>| t.filter(|s| !s.trim().is_empty());
        Self {
            title: keep(title),
            content: keep(content),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    /// In-memory equivalent of the SQL `ILIKE` match used by `PgStore`.
    pub fn matches(&self, title: &str, content: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        let hit = |needle: &Option<String>, haystack: &str| {
            needle
                .as_ref()
                .is_some_and(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };
        hit(&self.title, title) || hit(&self.content, content)
    }
}

/// Query parameters accepted by search endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
    pub content: Option<String>,
}
