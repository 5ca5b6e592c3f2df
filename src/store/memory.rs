//! In-process [`Store`] used by the test suites and by `DATABASE_URL=memory`.
//!
//! Mirrors the Postgres schema's behaviour: unique emails, newest-first post
//! listings, and `ON DELETE CASCADE` for comments.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

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

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, UserRow>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    last_user_id: i64,
    last_post_id: i64,
    last_comment_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Applies `offset`/`limit` to an already ordered list.
fn page_of<T>(rows: Vec<T>, page: Pagination) -> Vec<T> {
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let take = usize::try_from(page.limit).unwrap_or(usize::MAX);
    rows.into_iter().skip(skip).take(take).collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|row| row.user.email == user.email) {
            return Err(AppError::Conflict("User already exists.".to_string()));
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: tables.last_user_id,
            name: user.name,
            email: user.email,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            created.id,
            UserRow {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|row| row.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|row| row.user.email == email)
            .map(|row| row.user.clone()))
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|row| row.user.email == email)
            .map(|row| UserCredentials {
                id: row.user.id,
                name: row.user.name.clone(),
                email: row.user.email.clone(),
                password_hash: row.password_hash.clone(),
            }))
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().map(|row| row.user.clone()).collect())
    }

    async fn insert_post(&self, user_id: i64, title: &str, content: &str) -> Result<Post, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::InternalServerError(format!(
                "posts.user_id references missing user {}",
                user_id
            )));
        }

        tables.last_post_id += 1;
        let now = Utc::now();
        let post = Post {
            id: tables.last_post_id,
            user_id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).cloned())
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: Pagination,
    ) -> Result<(Vec<PostSummary>, i64), AppError> {
        let tables = self.tables.read().await;

        let mut matching: Vec<&Post> = tables
            .posts
            .values()
            .filter(|post| filter.author_id.is_none_or(|id| post.user_id == id))
            .filter(|post| filter.terms.matches(&post.title, &post.content))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let rows = page_of(matching, page)
            .into_iter()
            .map(|post| PostSummary {
                id: post.id,
                user_id: post.user_id,
                author: tables.users.get(&post.user_id).map(|row| row.user.name.clone()),
                title: post.title.clone(),
                content: post.content.clone(),
                created_at: post.created_at,
                updated_at: post.updated_at,
            })
            .collect();

        Ok((rows, total))
    }

    async fn update_post(&self, post: &Post) -> Result<Post, AppError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .posts
            .get_mut(&post.id)
            .ok_or(AppError::NotFound("Post not Found".to_string()))?;

        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, comment| comment.post_id != id);
        Ok(true)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(AppError::InternalServerError(format!(
                "comments.post_id references missing post {}",
                comment.post_id
            )));
        }
        if let Some(parent_id) = comment.parent_id {
            if !tables.comments.contains_key(&parent_id) {
                return Err(AppError::InternalServerError(format!(
                    "comments.parent_id references missing comment {}",
                    parent_id
                )));
            }
        }

        tables.last_comment_id += 1;
        let now = Utc::now();
        let created = Comment {
            id: tables.last_comment_id,
            title: comment.title,
            content: comment.content,
            user_id: comment.user_id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            created_at: now,
            updated_at: now,
        };
        tables.comments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.get(&id).cloned())
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let tables = self.tables.read().await;
        // BTreeMap iteration is id order, i.e. creation order.
        Ok(tables
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn search_comments(
        &self,
        terms: &SearchTerms,
        page: Pagination,
    ) -> Result<(Vec<Comment>, i64), AppError> {
        let tables = self.tables.read().await;
        let matching: Vec<Comment> = tables
            .comments
            .values()
            .filter(|comment| terms.matches(&comment.title, &comment.content))
            .cloned()
            .collect();

        let total = matching.len() as i64;
        Ok((page_of(matching, page), total))
    }

    async fn update_comment(&self, comment: &Comment) -> Result<Comment, AppError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .comments
            .get_mut(&comment.id)
            .ok_or(AppError::NotFound("Comment not Found".to_string()))?;

        stored.title = comment.title.clone();
        stored.content = comment.content.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.comments.contains_key(&id) {
            return Ok(false);
        }

        let mut doomed: HashSet<i64> = HashSet::from([id]);
        loop {
            let before = doomed.len();
            for comment in tables.comments.values() {
                if comment.parent_id.is_some_and(|parent| doomed.contains(&parent)) {
                    doomed.insert(comment.id);
                }
            }
            if doomed.len() == before {
                break;
            }
        }

        tables.comments.retain(|comment_id, _| !doomed.contains(comment_id));
        Ok(true)
    }
}
