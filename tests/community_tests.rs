// tests/community_tests.rs

use blog_api::utils::mail::LogMailer;
use blog_api::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;

struct TestApp {
    address: String,
    pool: SqlitePool,
}

/// Spawns the app on a random port against a fresh in-memory SQLite store.
/// `ai_api_url` points the AI proxy at a stub upstream when a test needs one.
async fn spawn_app_with_ai(ai_api_url: String) -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "community_test_secret".to_string(),
        jwt_refresh_secret: "community_test_refresh_secret".to_string(),
        jwt_expiration: 600,
        jwt_refresh_expiration: 3600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        ai_api_url,
        ai_api_key: None,
        smtp_host: None,
        smtp_user: None,
        smtp_pass: None,
        mail_from: "Test <test@localhost>".to_string(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        mailer: Arc::new(LogMailer),
        http: reqwest::Client::new(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp { address, pool }
}

async fn spawn_app() -> TestApp {
    spawn_app_with_ai("http://127.0.0.1:1/unused".to_string()).await
}

/// Stub text-generation upstream answering every POST with the given text
/// wrapped in a Cohere-style generations payload.
async fn spawn_ai_stub(text: &'static str) -> String {
    let app = axum::Router::new().route(
        "/generate",
        axum::routing::post(move || async move {
            axum::Json(serde_json::json!({ "generations": [{ "text": text }] }))
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}/generate", port)
}

async fn admin_token(client: &reqwest::Client, address: &str) -> String {
    let body = client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&serde_json::json!({ "username": "admin", "password": "secret123" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    body["data"]["accessToken"].as_str().unwrap().to_string()
}

async fn create_post(client: &reqwest::Client, address: &str, token: &str, title: &str) -> i64 {
    let body = client
        .post(format!("{}/api/v1/posts/create-post", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "title": title,
            "excerpt": "An excerpt",
            "content": "<p>Content</p>",
            "category": "DevOps",
            "slug": title.to_lowercase().replace(' ', "-"),
        }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    body["id"].as_i64().unwrap()
}

async fn submit_comment(client: &reqwest::Client, address: &str, post_id: i64, name: &str) {
    let response = client
        .post(format!("{}/api/v1/comments/{}", address, post_id))
        .json(&serde_json::json!({ "name": name, "text": "Nice post!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
}

async fn pending_comments(
    client: &reqwest::Client,
    address: &str,
    token: &str,
) -> serde_json::Value {
    client
        .get(format!("{}/api/v1/comments/pending-comments", address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()
}

async fn approved_comments(
    client: &reqwest::Client,
    address: &str,
    post_id: i64,
) -> serde_json::Value {
    client
        .get(format!(
            "{}/api/v1/comments/approved-comments/{}",
            address, post_id
        ))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()
}

#[tokio::test]
async fn submitted_comments_start_pending_and_stay_hidden() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;
    let post_id = create_post(&client, &app.address, &token, "Moderated Post").await;

    submit_comment(&client, &app.address, post_id, "alice").await;

    // Not visible publicly until approved.
    let approved = approved_comments(&client, &app.address, post_id).await;
    assert!(approved["approvedComments"].as_array().unwrap().is_empty());

    // Visible on the admin dashboard, annotated with its parent post.
    let pending = pending_comments(&client, &app.address, &token).await;
    let pending = pending["pendingComments"].as_array().unwrap().clone();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["name"], "alice");
    assert_eq!(pending[0]["postId"].as_i64().unwrap(), post_id);
    assert_eq!(pending[0]["postTitle"], "Moderated Post");

    // The post detail carries the comment with its pending status.
    let post = client
        .get(format!("{}/api/v1/posts/post/{}", app.address, post_id))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(post["comments"][0]["status"], "pending");
}

#[tokio::test]
async fn commenting_on_a_missing_post_is_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/comments/999999", app.address))
        .json(&serde_json::json!({ "name": "alice", "text": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn moderation_endpoints_require_auth() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/comments/pending-comments", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .patch(format!("{}/api/v1/comments/approve/1/1", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn approving_a_comment_publishes_it_and_clears_it_from_pending() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;
    let post_id = create_post(&client, &app.address, &token, "Post A").await;

    submit_comment(&client, &app.address, post_id, "alice").await;

    let pending = pending_comments(&client, &app.address, &token).await;
    let comment_id = pending["pendingComments"][0]["commentId"].as_i64().unwrap();

    let response = client
        .patch(format!(
            "{}/api/v1/comments/approve/{}/{}",
            app.address, post_id, comment_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let approved = approved_comments(&client, &app.address, post_id).await;
    let approved = approved["approvedComments"].as_array().unwrap().clone();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0]["name"], "alice");

    let pending = pending_comments(&client, &app.address, &token).await;
    assert!(pending["pendingComments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn the_last_moderation_transition_wins() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;
    let post_id = create_post(&client, &app.address, &token, "Post B").await;

    submit_comment(&client, &app.address, post_id, "bob").await;
    let pending = pending_comments(&client, &app.address, &token).await;
    let comment_id = pending["pendingComments"][0]["commentId"].as_i64().unwrap();

    for action in ["approve", "reject"] {
        let response = client
            .patch(format!(
                "{}/api/v1/comments/{}/{}/{}",
                app.address, action, post_id, comment_id
            ))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    // Rejected now: out of approved and out of pending.
    let approved = approved_comments(&client, &app.address, post_id).await;
    assert!(approved["approvedComments"].as_array().unwrap().is_empty());
    let pending = pending_comments(&client, &app.address, &token).await;
    assert!(pending["pendingComments"].as_array().unwrap().is_empty());

    let post = client
        .get(format!("{}/api/v1/posts/post/{}", app.address, post_id))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(post["comments"][0]["status"], "rejected");
}

#[tokio::test]
async fn moderating_unknown_targets_is_404() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;
    let post_id = create_post(&client, &app.address, &token, "Post C").await;

    let response = client
        .patch(format!("{}/api/v1/comments/approve/999999/1", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .patch(format!(
            "{}/api/v1/comments/approve/{}/999999",
            app.address, post_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn comment_aggregates_count_statuses_correctly() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &app.address).await;

    let post_a = create_post(&client, &app.address, &token, "Counted A").await;
    let post_b = create_post(&client, &app.address, &token, "Counted B").await;

    submit_comment(&client, &app.address, post_a, "alice").await;
    submit_comment(&client, &app.address, post_a, "bob").await;
    submit_comment(&client, &app.address, post_b, "carol").await;

    // Approve the two comments on post A, leave post B's pending.
    let pending = pending_comments(&client, &app.address, &token).await;
    for comment in pending["pendingComments"].as_array().unwrap() {
        if comment["postId"].as_i64().unwrap() == post_a {
            client
                .patch(format!(
                    "{}/api/v1/comments/approve/{}/{}",
                    app.address,
                    post_a,
                    comment["commentId"].as_i64().unwrap()
                ))
                .bearer_auth(&token)
                .send()
                .await
                .unwrap();
        }
    }

    // Total counts every status.
    let body = client
        .get(format!("{}/api/v1/comments/total-comments", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(body["totalComments"].as_i64().unwrap(), 3);

    // The histogram only counts approved, and keeps zero-count posts.
    let body = client
        .get(format!(
            "{}/api/v1/comments/approved-comments-per-blog",
            app.address
        ))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let counts = body.as_array().unwrap();
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0]["title"], "Counted A");
    assert_eq!(counts[0]["commentCount"].as_i64().unwrap(), 2);
    assert_eq!(counts[1]["title"], "Counted B");
    assert_eq!(counts[1]["commentCount"].as_i64().unwrap(), 0);
}

async fn stored_otp(pool: &SqlitePool, email: &str) -> Option<String> {
    sqlx::query_scalar("SELECT otp FROM user_requests WHERE email = ? ORDER BY id DESC")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn join_request_stores_an_otp_but_never_returns_it() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/requests/join", app.address))
        .json(&serde_json::json!({
            "email": "alice@example.com",
            "fullName": "Alice Doe",
            "reason": "I want to write"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["message"], "OTP sent to your email for verification.");
    assert!(body.get("otp").is_none());

    let otp = stored_otp(&app.pool, "alice@example.com").await.unwrap();
    assert_eq!(otp.len(), 6);
    assert!(otp.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn duplicate_join_request_email_is_a_conflict() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let payload = serde_json::json!({
        "email": "alice@example.com",
        "fullName": "Alice Doe",
        "reason": "I want to write"
    });

    client
        .post(format!("{}/api/v1/requests/join", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/v1/requests/join", app.address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn otp_verification_succeeds_exactly_once() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/v1/requests/join", app.address))
        .json(&serde_json::json!({
            "email": "alice@example.com",
            "fullName": "Alice Doe",
            "reason": "I want to write"
        }))
        .send()
        .await
        .unwrap();

    // Unknown email
    let response = client
        .post(format!("{}/api/v1/requests/verify", app.address))
        .json(&serde_json::json!({ "email": "nobody@example.com", "otp": "000000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Wrong code
    let otp = stored_otp(&app.pool, "alice@example.com").await.unwrap();
    let wrong = if otp == "123456" { "654321" } else { "123456" };
    let response = client
        .post(format!("{}/api/v1/requests/verify", app.address))
        .json(&serde_json::json!({ "email": "alice@example.com", "otp": wrong }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Correct code, inside the window
    let response = client
        .post(format!("{}/api/v1/requests/verify", app.address))
        .json(&serde_json::json!({ "email": "alice@example.com", "otp": otp }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // The OTP was cleared, so replaying it fails.
    assert!(stored_otp(&app.pool, "alice@example.com").await.is_none());
    let response = client
        .post(format!("{}/api/v1/requests/verify", app.address))
        .json(&serde_json::json!({ "email": "alice@example.com", "otp": otp }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let verified: bool =
        sqlx::query_scalar("SELECT is_verified FROM user_requests WHERE email = ?")
            .bind("alice@example.com")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert!(verified);
}

#[tokio::test]
async fn expired_otp_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/v1/requests/join", app.address))
        .json(&serde_json::json!({
            "email": "late@example.com",
            "fullName": "Late Larry",
            "reason": "Slow typist"
        }))
        .send()
        .await
        .unwrap();

    // Push the deadline into the past.
    sqlx::query("UPDATE user_requests SET otp_expires_at = ? WHERE email = ?")
        .bind(chrono::Utc::now() - chrono::Duration::minutes(1))
        .bind("late@example.com")
        .execute(&app.pool)
        .await
        .unwrap();

    let otp = stored_otp(&app.pool, "late@example.com").await.unwrap();
    let response = client
        .post(format!("{}/api/v1/requests/verify", app.address))
        .json(&serde_json::json!({ "email": "late@example.com", "otp": otp }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "OTP expired");
}

#[tokio::test]
async fn all_users_returns_the_first_request_per_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/v1/requests/join", app.address))
        .json(&serde_json::json!({
            "email": "dup@example.com",
            "fullName": "First Submission",
            "reason": "r"
        }))
        .send()
        .await
        .unwrap();

    // A historical duplicate, inserted behind the handler's uniqueness check.
    sqlx::query(
        "INSERT INTO user_requests (email, full_name, reason, is_verified, created_at) \
         VALUES (?, ?, ?, 0, ?)",
    )
    .bind("dup@example.com")
    .bind("Second Submission")
    .bind("r")
    .bind(chrono::Utc::now())
    .execute(&app.pool)
    .await
    .unwrap();

    let body = client
        .get(format!("{}/api/v1/requests/all-users", app.address))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["fullName"], "First Submission");
    // OTP material never leaves the server.
    assert!(users[0].get("otp").is_none());
    assert!(users[0].get("otpExpiresAt").is_none());
}

#[tokio::test]
async fn member_signup_login_and_dashboard() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!(
            "{}/api/v1/user/request-user/signup",
            app.address
        ))
        .json(&serde_json::json!({ "username": "member1", "password": "memberpass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // Duplicate member username
    let response = client
        .post(format!(
            "{}/api/v1/user/request-user/signup",
            app.address
        ))
        .json(&serde_json::json!({ "username": "member1", "password": "memberpass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let body = client
        .post(format!("{}/api/v1/user/request-user/login", app.address))
        .json(&serde_json::json!({ "username": "member1", "password": "memberpass" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap();

    let response = client
        .get(format!(
            "{}/api/v1/user/request-user/dashboard",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let body = client
        .get(format!(
            "{}/api/v1/user/request-user/dashboard",
            app.address
        ))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(body["data"]["username"], "member1");
    assert_eq!(body["data"]["customMessage"], "Welcome back, member1!");
}

#[tokio::test]
async fn member_tokens_do_not_open_admin_routes_and_vice_versa() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Admin and member both get row id 1 in their respective tables, so only
    // the token scope can tell them apart.
    let admin = admin_token(&client, &app.address).await;

    let body = client
        .post(format!(
            "{}/api/v1/user/request-user/signup",
            app.address
        ))
        .json(&serde_json::json!({ "username": "member1", "password": "memberpass" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let member = body["token"].as_str().unwrap().to_string();

    let response = client
        .get(format!("{}/api/v1/auth/dashboard", app.address))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .post(format!("{}/api/v1/posts/create-post", app.address))
        .bearer_auth(&member)
        .json(&serde_json::json!({
            "title": "T", "excerpt": "E", "content": "C",
            "category": "DevOps", "slug": "t"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(format!(
            "{}/api/v1/user/request-user/dashboard",
            app.address
        ))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn ai_meta_passes_through_well_formed_upstream_json() {
    let ai_url = spawn_ai_stub(
        r#"{"titles": ["A", "B", "C"], "metaDescription": "Short and catchy.", "seoTags": ["t1", "t2", "t3", "t4", "t5"]}"#,
    )
    .await;
    let app = spawn_app_with_ai(ai_url).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/ai/generate-meta", app.address))
        .json(&serde_json::json!({ "blogContent": "Rust makes servers fun." }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["titles"].as_array().unwrap().len(), 3);
    assert_eq!(body["metaDescription"], "Short and catchy.");
    assert_eq!(body["seoTags"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn ai_meta_surfaces_unparseable_output_with_the_raw_text() {
    let ai_url = spawn_ai_stub("Sure! Here are three titles: ...").await;
    let app = spawn_app_with_ai(ai_url).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/ai/generate-meta", app.address))
        .json(&serde_json::json!({ "blogContent": "Some content" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["raw"], "Sure! Here are three titles: ...");
}

#[tokio::test]
async fn ai_meta_maps_transport_failure_to_bad_gateway() {
    // No listener on this port: the HTTP call itself fails.
    let app = spawn_app_with_ai("http://127.0.0.1:1/generate".to_string()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/ai/generate-meta", app.address))
        .json(&serde_json::json!({ "blogContent": "Some content" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);
}
