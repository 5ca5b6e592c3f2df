// tests/comment_thread_tests.rs

use std::sync::Arc;

use blog_backend::{config::Config, routes, state::AppState, store::MemoryStore};
use serde_json::{Value, json};

async fn spawn_app() -> String {
    let config = Config {
        database_url: "memory".to_string(),
        jwt_secret: "comment_test_secret".to_string(),
        jwt_expiration: 600,
        port: 0,
        rust_log: "error".to_string(),
    };

    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        config,
    };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn sign_up(client: &reqwest::Client, address: &str, name: &str) -> String {
    let body: Value = client
        .post(format!("{}/auth/signup", address))
        .json(&json!({
            "name": name,
            "email": format!("{}_{}@example.com", name, &uuid::Uuid::new_v4().to_string()[..8]),
            "password": "password123"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn create_post(client: &reqwest::Client, address: &str, token: &str) -> i64 {
    let body: Value = client
        .post(format!("{}/posts", address))
        .bearer_auth(token)
        .json(&json!({ "title": "Threads", "content": "Discuss below" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["id"].as_i64().unwrap()
}

async fn reply(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    post_id: i64,
    parent_id: Option<i64>,
    content: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/comments", address))
        .bearer_auth(token)
        .json(&json!({ "content": content, "post_id": post_id, "parent_id": parent_id }))
        .send()
        .await
        .unwrap()
}

async fn reply_id(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    post_id: i64,
    parent_id: Option<i64>,
    content: &str,
) -> i64 {
    let response = reply(client, address, token, post_id, parent_id, content).await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn deep_replies_collapse_onto_the_grandparent() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &address, "threader").await;
    let post_id = create_post(&client, &address, &token).await;

    // Act: A <- B <- C, then a reply to C
    let a = reply_id(&client, &address, &token, post_id, None, "A").await;
    let b = reply_id(&client, &address, &token, post_id, Some(a), "B").await;
    let c = reply_id(&client, &address, &token, post_id, Some(b), "C").await;

    let response = reply(&client, &address, &token, post_id, Some(c), "D").await;
    assert_eq!(response.status().as_u16(), 201);
    let d: Value = response.json().await.unwrap();

    // Assert: D was re-parented onto B and got the default title
    assert_eq!(d["parent_id"], b);
    assert_eq!(d["title"], "reply");

    let body: Value = client
        .get(format!("{}/comments/post/{}", address, post_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let roots = body["comments"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["id"], a);
    let level_one = roots[0]["subComments"].as_array().unwrap();
    assert_eq!(level_one.len(), 1);
    assert_eq!(level_one[0]["id"], b);
    let level_two: Vec<i64> = level_one[0]["subComments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(level_two, vec![c, d["id"].as_i64().unwrap()]);
}

#[tokio::test]
async fn reply_checks_post_and_parent() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &address, "checker").await;
    let first = create_post(&client, &address, &token).await;
    let second = create_post(&client, &address, &token).await;

    // Missing post
    let response = reply(&client, &address, &token, 999_999, None, "hello").await;
    assert_eq!(response.status().as_u16(), 404);

    // Missing parent
    let response = reply(&client, &address, &token, first, Some(999_999), "hello").await;
    assert_eq!(response.status().as_u16(), 400);

    // Parent on another post
    let on_first = reply_id(&client, &address, &token, first, None, "top").await;
    let response = reply(&client, &address, &token, second, Some(on_first), "hello").await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], format!("This comment is not on post {}", second));
}

#[tokio::test]
async fn only_the_author_edits_or_deletes() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let author = sign_up(&client, &address, "author").await;
    let other = sign_up(&client, &address, "other").await;
    let post_id = create_post(&client, &address, &author).await;
    let comment = reply_id(&client, &address, &author, post_id, None, "mine").await;

    let response = client
        .put(format!("{}/comments/{}", address, comment))
        .bearer_auth(&other)
        .json(&json!({ "content": "not yours" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .put(format!("{}/comments/{}", address, comment))
        .bearer_auth(&author)
        .json(&json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["content"], "edited");

    let response = client
        .delete(format!("{}/comments/{}", address, comment))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .delete(format!("{}/comments/{}", address, comment))
        .bearer_auth(&author)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn deleting_cascades_to_replies_and_comments() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &address, "cascader").await;
    let post_id = create_post(&client, &address, &token).await;

    let a = reply_id(&client, &address, &token, post_id, None, "A").await;
    let b = reply_id(&client, &address, &token, post_id, Some(a), "B").await;
    let other = reply_id(&client, &address, &token, post_id, None, "other").await;

    // Deleting A removes B with it
    let response = client
        .delete(format!("{}/comments/{}", address, a))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(format!("{}/comments/{}", address, b))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Deleting the post removes the rest
    let response = client
        .delete(format!("{}/posts/{}", address, post_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(format!("{}/comments/{}", address, other))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn posts_come_with_their_comment_trees() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &address, "reader").await;
    let other = sign_up(&client, &address, "nosy").await;
    let post_id = create_post(&client, &address, &token).await;
    let a = reply_id(&client, &address, &token, post_id, None, "A").await;
    reply_id(&client, &address, &token, post_id, Some(a), "B").await;

    let thread: Value = client
        .get(format!("{}/posts/{}/comments", address, post_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(thread["id"], post_id);
    assert_eq!(thread["author"], "reader");
    assert_eq!(thread["comments"][0]["subComments"][0]["content"], "B");

    let page: Value = client
        .get(format!("{}/posts/comments", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["posts"][0]["comments"][0]["id"], a);

    // A user's threads are visible to that user only
    let user_id = thread["user_id"].as_i64().unwrap();
    let response = client
        .get(format!("{}/posts/comments/user/{}", address, user_id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .get(format!("{}/posts/comments/user/{}", address, user_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn comment_search_pages_results() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &address, "searcher").await;
    let post_id = create_post(&client, &address, &token).await;
    for content in ["Great point", "great again", "unrelated"] {
        reply_id(&client, &address, &token, post_id, None, content).await;
    }

    let body: Value = client
        .get(format!("{}/comments?content=great&limit=1", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["nextPage"],
        format!("{}/comments?content=great&limit=1&page=2", address)
    );

    let response = client
        .get(format!("{}/comments", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn comment_without_post_id_is_a_json_bad_request() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = sign_up(&client, &address, "forgetful").await;

    let response = client
        .post(format!("{}/comments", address))
        .bearer_auth(&token)
        .json(&json!({ "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("post_id"));

    let response = client
        .get(format!("{}/comments/not-a-number", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());
}
