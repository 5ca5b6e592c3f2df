// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, comment as comments, post as posts, user as users},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * `/auth` is public.
/// * `/posts` and `/users` mix public reads with protected routes.
/// * `/comments` is protected throughout.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/signup", post(auth::sign_up))
        .route("/signin", post(auth::sign_in));

    let post_routes = Router::new()
        .route(
            "/",
            get(posts::list_posts).merge(post(posts::create_post).route_layer(require_auth.clone())),
        )
        .route("/search", get(posts::search_posts))
        .route(
            "/{id}",
            get(posts::get_post).merge(
                put(posts::update_post)
                    .delete(posts::delete_post)
                    .route_layer(require_auth.clone()),
            ),
        )
        // Protected post routes
        .merge(
            Router::new()
                .route("/me", get(posts::list_my_posts))
                .route("/me/search", get(posts::search_my_posts))
                .route("/comments", get(posts::list_post_threads))
                .route("/comments/search", get(posts::search_post_threads))
                .route("/comments/user/{user_id}", get(posts::list_user_post_threads))
                .route("/{id}/comments", get(posts::get_post_thread))
                .route_layer(require_auth.clone()),
        );

    let comment_routes = Router::new()
        .route(
            "/",
            get(comments::search_comments).post(comments::create_comment),
        )
        .route("/post/{post_id}", get(comments::post_comments))
        .route(
            "/{comment_id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route_layer(require_auth.clone());

    let user_routes = Router::new().route("/", get(users::list_users)).merge(
        Router::new()
            .route("/me", get(users::me))
            .route("/find/{user_id}", get(users::find_user))
            .route_layer(require_auth),
    );

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/posts", post_routes)
        .nest("/comments", comment_routes)
        .nest("/users", user_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
