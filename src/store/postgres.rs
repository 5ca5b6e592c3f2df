//! Postgres-backed [`Store`].
//!
//! Runtime-checked queries (`query_as::<_, T>`). Cascades come from the
//! schema in `migrations/`.

use async_trait::async_trait;
use sqlx::PgPool;

use super::Store;
use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        post::{Post, PostFilter, PostSummary, SearchTerms},
        user::{NewUser, User, UserCredentials},
    },
    utils::pagination::Pagination,
};

const USER_COLUMNS: &str = "id, name, email, created_at, updated_at";
const POST_COLUMNS: &str = "id, user_id, title, content, created_at, updated_at";
const SUMMARY_COLUMNS: &str =
    "p.id, p.user_id, u.name AS author, p.title, p.content, p.created_at, p.updated_at";
const COMMENT_COLUMNS: &str =
    "id, title, content, user_id, post_id, parent_id, created_at, updated_at";

/// `$1` author, `$2` title pattern, `$3` content pattern.
const POST_FILTER: &str = "($1::BIGINT IS NULL OR p.user_id = $1)
      AND (($2::TEXT IS NULL AND $3::TEXT IS NULL)
           OR p.title ILIKE $2
           OR p.content ILIKE $3)";

/// `$1` title pattern, `$2` content pattern.
const COMMENT_FILTER: &str = "($1::TEXT IS NULL AND $2::TEXT IS NULL)
      OR title ILIKE $1
      OR content ILIKE $2";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &Option<String>) -> Option<String> {
    term.as_ref().map(|t| {
        let escaped = t
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let query = format!(
            "INSERT INTO users (name, email, password)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("User already exists.".to_string())
                } else {
                    tracing::error!("Failed to insert user: {:?}", e);
                    AppError::from(e)
                }
            })
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        Ok(sqlx::query_as::<_, UserCredentials>(
            "SELECT id, name, email, password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC");
        Ok(sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_post(&self, user_id: i64, title: &str, content: &str) -> Result<Post, AppError> {
        let query = format!(
            "INSERT INTO posts (user_id, title, content)
             VALUES ($1, $2, $3)
             RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(user_id)
            .bind(title)
            .bind(content)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create post: {:?}", e);
                AppError::from(e)
            })
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: Pagination,
    ) -> Result<(Vec<PostSummary>, i64), AppError> {
        let title = like_pattern(&filter.terms.title);
        let content = like_pattern(&filter.terms.content);

        let query = format!(
            "SELECT {SUMMARY_COLUMNS}
             FROM posts p
             LEFT JOIN users u ON u.id = p.user_id
             WHERE {POST_FILTER}
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, PostSummary>(&query)
            .bind(filter.author_id)
            .bind(&title)
            .bind(&content)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list posts: {:?}", e);
                AppError::from(e)
            })?;

        let count = format!("SELECT COUNT(*) FROM posts p WHERE {POST_FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&count)
            .bind(filter.author_id)
            .bind(&title)
            .bind(&content)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn update_post(&self, post: &Post) -> Result<Post, AppError> {
        let query = format!(
            "UPDATE posts SET title = $2, content = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(post.id)
            .bind(&post.title)
            .bind(&post.content)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Post not Found".to_string()))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, AppError> {
        let query = format!(
            "INSERT INTO comments (title, content, user_id, post_id, parent_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(&comment.title)
            .bind(&comment.content)
            .bind(comment.user_id)
            .bind(comment.post_id)
            .bind(comment.parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create comment: {:?}", e);
                AppError::from(e)
            })
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let query = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        Ok(sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE post_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, Comment>(&query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn search_comments(
        &self,
        terms: &SearchTerms,
        page: Pagination,
    ) -> Result<(Vec<Comment>, i64), AppError> {
        let title = like_pattern(&terms.title);
        let content = like_pattern(&terms.content);

        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE {COMMENT_FILTER}
             ORDER BY created_at ASC, id ASC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, Comment>(&query)
            .bind(&title)
            .bind(&content)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let count = format!("SELECT COUNT(*) FROM comments WHERE {COMMENT_FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&count)
            .bind(&title)
            .bind(&content)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn update_comment(&self, comment: &Comment) -> Result<Comment, AppError> {
        let query = format!(
            "UPDATE comments SET title = $2, content = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(comment.id)
            .bind(&comment.title)
            .bind(&comment.content)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Comment not Found".to_string()))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(&None), None);
        assert_eq!(
            like_pattern(&Some("50%_off\\".to_string())).as_deref(),
            Some("%50\\%\\_off\\\\%")
        );
    }
}
