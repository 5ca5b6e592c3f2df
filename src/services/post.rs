use futures::future::try_join_all;

use crate::{
    error::AppError,
    models::{
        post::{
            CreatePostRequest, Post, PostFilter, PostListItem, PostSummary, PostThread,
            SearchParams, SearchTerms, UpdatePostRequest,
        },
    },
    services::{ensure_owner, non_empty, thread::build_tree},
    store::Store,
    utils::pagination::{Paged, Pagination},
};

pub async fn create_post(
    store: &dyn Store,
    owner_id: i64,
    request: CreatePostRequest,
) -> Result<Post, AppError> {
    let post = store
        .insert_post(owner_id, &request.title, &request.content)
        .await?;
    tracing::info!("User {} created post {}", owner_id, post.id);
    Ok(post)
}

pub async fn get_post(store: &dyn Store, post_id: i64) -> Result<Post, AppError> {
    store
        .find_post(post_id)
        .await?
        .ok_or(AppError::NotFound("Post not Found".to_string()))
}

/// Applies the non-blank fields of `request`. Owner only.
pub async fn update_post(
    store: &dyn Store,
    caller_id: i64,
    post_id: i64,
    request: UpdatePostRequest,
) -> Result<Post, AppError> {
    let mut post = get_post(store, post_id).await?;
    if let Err(e) = ensure_owner(post.user_id, caller_id) {
        tracing::warn!("User {} tried to edit post {}", caller_id, post_id);
        return Err(e);
    }

    if let Some(title) = non_empty(request.title) {
        post.title = title;
    }
    if let Some(content) = non_empty(request.content) {
        post.content = content;
    }

    store.update_post(&post).await
}

/// Deletes a post and, through the store, all of its comments. Owner only.
pub async fn delete_post(store: &dyn Store, caller_id: i64, post_id: i64) -> Result<(), AppError> {
    let post = get_post(store, post_id).await?;
    if let Err(e) = ensure_owner(post.user_id, caller_id) {
        tracing::warn!("User {} tried to delete post {}", caller_id, post_id);
        return Err(e);
    }

    if !store.delete_post(post_id).await? {
        return Err(AppError::NotFound("Post not Found".to_string()));
    }
    tracing::info!("User {} deleted post {}", caller_id, post_id);
    Ok(())
}

async fn list(
    store: &dyn Store,
    filter: PostFilter,
    pagination: Pagination,
) -> Result<Paged<PostSummary>, AppError> {
    let (items, total) = store.list_posts(&filter, pagination).await?;
    Ok(Paged {
        items,
        total,
        pagination,
    })
}

fn required_terms(params: SearchParams) -> Result<SearchTerms, AppError> {
    let terms = SearchTerms::new(params.title, params.content);
    if terms.is_empty() {
        return Err(AppError::BadRequest(
            "Title or content query parameter is required".to_string(),
        ));
    }
    Ok(terms)
}

/// All posts, newest first.
pub async fn list_posts(
    store: &dyn Store,
    pagination: Pagination,
) -> Result<Paged<PostListItem>, AppError> {
    Ok(list(store, PostFilter::default(), pagination)
        .await?
        .map(PostListItem::from))
}

/// The caller's own posts, newest first.
pub async fn list_my_posts(
    store: &dyn Store,
    user_id: i64,
    pagination: Pagination,
) -> Result<Paged<PostListItem>, AppError> {
    let filter = PostFilter {
        author_id: Some(user_id),
        ..PostFilter::default()
    };
    Ok(list(store, filter, pagination).await?.map(PostListItem::from))
}

/// The caller's own posts whose title contains `title`.
pub async fn search_my_posts(
    store: &dyn Store,
    user_id: i64,
    title: Option<String>,
    pagination: Pagination,
) -> Result<Paged<PostListItem>, AppError> {
    let terms = SearchTerms::new(title, None);
    if terms.is_empty() {
        return Err(AppError::BadRequest(
            "Title query parameter is required".to_string(),
        ));
    }

    let filter = PostFilter {
        author_id: Some(user_id),
        terms,
    };
    Ok(list(store, filter, pagination).await?.map(PostListItem::from))
}

/// Posts whose title or content contains the given terms.
pub async fn search_posts(
    store: &dyn Store,
    params: SearchParams,
    pagination: Pagination,
) -> Result<Paged<PostListItem>, AppError> {
    let filter = PostFilter {
        author_id: None,
        terms: required_terms(params)?,
    };
    Ok(list(store, filter, pagination).await?.map(PostListItem::from))
}

/// Loads every post's comment tree, one concurrent batch per post, keeping
/// the posts in their original order.
async fn with_comments(
    store: &dyn Store,
    posts: Paged<PostSummary>,
) -> Result<Paged<PostThread>, AppError> {
    let trees = try_join_all(
        posts
            .items
            .iter()
            .map(|post| store.comments_for_post(post.id)),
    )
    .await?;

    let items = posts
        .items
        .into_iter()
        .zip(trees)
        .map(|(post, comments)| PostThread {
            post,
            comments: build_tree(comments),
        })
        .collect();

    Ok(Paged {
        items,
        total: posts.total,
        pagination: posts.pagination,
    })
}

/// A page of posts, each with its comments nested.
pub async fn list_post_threads(
    store: &dyn Store,
    pagination: Pagination,
) -> Result<Paged<PostThread>, AppError> {
    let posts = list(store, PostFilter::default(), pagination).await?;
    with_comments(store, posts).await
}

/// A page of `user_id`'s posts with comments. Only that user may ask.
pub async fn list_user_post_threads(
    store: &dyn Store,
    caller_id: i64,
    user_id: i64,
    pagination: Pagination,
) -> Result<Paged<PostThread>, AppError> {
    ensure_owner(user_id, caller_id)?;

    let filter = PostFilter {
        author_id: Some(user_id),
        ..PostFilter::default()
    };
    let posts = list(store, filter, pagination).await?;
    with_comments(store, posts).await
}

pub async fn search_post_threads(
    store: &dyn Store,
    params: SearchParams,
    pagination: Pagination,
) -> Result<Paged<PostThread>, AppError> {
    let filter = PostFilter {
        author_id: None,
        terms: required_terms(params)?,
    };
    let posts = list(store, filter, pagination).await?;
    with_comments(store, posts).await
}

/// One post with its comments nested.
pub async fn get_post_thread(store: &dyn Store, post_id: i64) -> Result<PostThread, AppError> {
    let post = get_post(store, post_id).await?;
    let author = store.find_user(post.user_id).await?.map(|user| user.name);
    let comments = build_tree(store.comments_for_post(post_id).await?);

    Ok(PostThread {
        post: PostSummary {
            id: post.id,
            user_id: post.user_id,
            author,
            title: post.title,
            content: post.content,
            created_at: post.created_at,
            updated_at: post.updated_at,
        },
        comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{comment::CreateCommentRequest, user::NewUser},
        services::comment::create_comment,
        store::MemoryStore,
    };

    const PAGE: Pagination = Pagination { page: 1, limit: 10 };

    async fn user(store: &MemoryStore, name: &str) -> i64 {
        store
            .insert_user(NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    fn new_post(title: &str, content: &str) -> CreatePostRequest {
        CreatePostRequest {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    fn comment_on(post_id: i64, parent_id: Option<i64>) -> CreateCommentRequest {
        CreateCommentRequest {
            title: None,
            content: "nice".to_string(),
            post_id,
            parent_id,
        }
    }

    #[tokio::test]
    async fn non_owner_update_is_forbidden_and_row_unchanged() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let post = create_post(&store, alice, new_post("Mine", "original")).await.unwrap();

        let result = update_post(
            &store,
            bob,
            post.id,
            UpdatePostRequest {
                title: Some("Stolen".into()),
                content: None,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let stored = get_post(&store, post.id).await.unwrap();
        assert_eq!(stored.title, "Mine");
        assert_eq!(stored.content, "original");
    }

    #[tokio::test]
    async fn partial_update_keeps_missing_fields() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let post = create_post(&store, alice, new_post("Title", "Body")).await.unwrap();

        let updated = update_post(
            &store,
            alice,
            post.id,
            UpdatePostRequest {
                title: Some("".into()),
                content: Some("New body".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Title");
        assert_eq!(updated.content, "New body");
    }

    #[tokio::test]
    async fn deleting_a_post_cascades_to_comments() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let post = create_post(&store, alice, new_post("T", "C")).await.unwrap();
        let root = create_comment(&store, alice, comment_on(post.id, None)).await.unwrap();
        create_comment(&store, alice, comment_on(post.id, Some(root.id))).await.unwrap();

        delete_post(&store, alice, post.id).await.unwrap();

        assert!(store.comments_for_post(post.id).await.unwrap().is_empty());
        assert!(store.find_comment(root.id).await.unwrap().is_none());
        assert!(matches!(
            get_post(&store, post.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn search_matches_either_field_case_insensitively() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        create_post(&store, alice, new_post("Rust ownership", "borrowing")).await.unwrap();
        create_post(&store, alice, new_post("Gardening", "tomatoes and RUST spots")).await.unwrap();
        create_post(&store, alice, new_post("Cooking", "pasta")).await.unwrap();

        let by_title = search_posts(
            &store,
            SearchParams {
                title: Some("rust".into()),
                content: None,
            },
            PAGE,
        )
        .await
        .unwrap();
        assert_eq!(by_title.total, 1);

        let either = search_posts(
            &store,
            SearchParams {
                title: Some("rust".into()),
                content: Some("rust".into()),
            },
            PAGE,
        )
        .await
        .unwrap();
        assert_eq!(either.total, 2);

        let missing = search_posts(&store, SearchParams::default(), PAGE).await;
        assert!(matches!(missing, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn markup_characters_are_stored_verbatim_and_searchable() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let post = create_post(&store, alice, new_post("Tom & Jerry", "if a < b && b > c"))
            .await
            .unwrap();

        let stored = get_post(&store, post.id).await.unwrap();
        assert_eq!(stored.title, "Tom & Jerry");
        assert_eq!(stored.content, "if a < b && b > c");

        let found = search_posts(
            &store,
            SearchParams {
                title: Some("Tom & Jerry".into()),
                content: None,
            },
            PAGE,
        )
        .await
        .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].title, "Tom & Jerry");
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_paged() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        for i in 0..3 {
            create_post(&store, alice, new_post(&format!("Post {}", i), "x")).await.unwrap();
        }

        let first = list_posts(&store, Pagination { page: 1, limit: 2 }).await.unwrap();
        assert_eq!(first.total, 3);
        let titles: Vec<&str> = first.items.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Post 2", "Post 1"]);
        assert_eq!(first.items[0].author.as_deref(), Some("alice"));

        let second = list_posts(&store, Pagination { page: 2, limit: 2 }).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].title, "Post 0");
    }

    #[tokio::test]
    async fn threads_carry_their_own_comments() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let first = create_post(&store, alice, new_post("First", "x")).await.unwrap();
        let second = create_post(&store, bob, new_post("Second", "y")).await.unwrap();
        let root = create_comment(&store, bob, comment_on(first.id, None)).await.unwrap();
        create_comment(&store, alice, comment_on(first.id, Some(root.id))).await.unwrap();

        let page = list_post_threads(&store, PAGE).await.unwrap();
        assert_eq!(page.items[0].post.id, second.id);
        assert!(page.items[0].comments.is_empty());
        assert_eq!(page.items[1].comments.len(), 1);
        assert_eq!(page.items[1].comments[0].sub_comments.len(), 1);

        let thread = get_post_thread(&store, first.id).await.unwrap();
        assert_eq!(thread.post.author.as_deref(), Some("alice"));
        assert_eq!(thread.comments[0].comment.id, root.id);
    }

    #[tokio::test]
    async fn user_threads_are_private_to_that_user() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        create_post(&store, alice, new_post("A", "x")).await.unwrap();
        create_post(&store, bob, new_post("B", "y")).await.unwrap();

        assert!(matches!(
            list_user_post_threads(&store, bob, alice, PAGE).await,
            Err(AppError::Forbidden(_))
        ));
        let own = list_user_post_threads(&store, alice, alice, PAGE).await.unwrap();
        assert_eq!(own.total, 1);
        assert_eq!(own.items[0].post.title, "A");
    }

    #[tokio::test]
    async fn my_search_requires_title_and_filters_owner() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        create_post(&store, alice, new_post("Notes on axum", "x")).await.unwrap();
        create_post(&store, bob, new_post("More axum", "y")).await.unwrap();

        assert!(search_my_posts(&store, alice, None, PAGE).await.is_err());
        let mine = search_my_posts(&store, alice, Some("AXUM".into()), PAGE).await.unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.items[0].title, "Notes on axum");
    }
}
