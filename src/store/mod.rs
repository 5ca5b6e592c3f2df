//! Persistence seam.
//!
//! Services talk to a [`Store`] rather than a pool. [`PgStore`] is the
//! production backend; [`MemoryStore`] serves tests and `DATABASE_URL=memory`.
//! Cascading deletes (post -> comments, comment -> replies) are the store's
//! responsibility.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        post::{Post, PostFilter, PostSummary, SearchTerms},
        user::{NewUser, User, UserCredentials},
    },
    utils::pagination::Pagination,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type SharedStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Fails with `Conflict` if the email is already taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// The only lookup that returns the password hash.
    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    // Posts

    async fn insert_post(&self, user_id: i64, title: &str, content: &str) -> Result<Post, AppError>;
    async fn find_post(&self, id: i64) -> Result<Option<Post>, AppError>;
    /// Newest first. Returns the page and the total number of matching rows.
    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: Pagination,
    ) -> Result<(Vec<PostSummary>, i64), AppError>;
    /// Writes title and content and bumps `updated_at`.
    async fn update_post(&self, post: &Post) -> Result<Post, AppError>;
    /// Deletes the post and all of its comments. `false` if it did not exist.
    async fn delete_post(&self, id: i64) -> Result<bool, AppError>;

    // Comments

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, AppError>;
    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, AppError>;
    /// All comments of a post, oldest first.
    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, AppError>;
    /// Oldest first. Returns the page and the total number of matching rows.
    async fn search_comments(
        &self,
        terms: &SearchTerms,
        page: Pagination,
    ) -> Result<(Vec<Comment>, i64), AppError>;
    async fn update_comment(&self, comment: &Comment) -> Result<Comment, AppError>;
    /// Deletes the comment and every reply below it. `false` if it did not exist.
    async fn delete_comment(&self, id: i64) -> Result<bool, AppError>;
}
