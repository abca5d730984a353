// src/handlers/auth.rs

use std::net::SocketAddr;

use axum::{
    Extension, Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse},
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{AuthUser, LoginRequest, SignupRequest, UpdatePasswordRequest, User},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::issue_tokens,
    },
};

/// Expires the `token` cookie on logout / account deletion.
const CLEAR_COOKIE: &str = "token=none; Max-Age=10; Path=/; HttpOnly";

/// Caller IP as recorded in the session list: first `x-forwarded-for` hop
/// when present, socket address otherwise.
fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| addr.ip().to_string())
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Appends one session row for a fresh login. Location resolution is not
/// wired up, so it is defaulted.
async fn record_session(
    pool: &SqlitePool,
    user_id: i64,
    refresh_token: &str,
    ip: &str,
    user_agent: &str,
) -> Result<(), AppError> {
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO sessions (user_id, refresh_token, ip, user_agent, location, created_at, last_used)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(refresh_token)
    .bind(ip)
    .bind(user_agent)
    .bind("Unknown")
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Registers the admin user.
///
/// Hashes the password using Argon2 before storing it, then issues a token
/// pair and records the first session.
pub async fn signup(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, password, created_at) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(chrono::Utc::now())
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            AppError::Conflict("Username already exists".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    let (access_token, refresh_token) = issue_tokens(user_id, &state.config)?;

    record_session(
        &state.pool,
        user_id,
        &refresh_token,
        &client_ip(&headers, &addr),
        &user_agent(&headers),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "username": payload.username,
                "accessToken": access_token,
                "refreshToken": refresh_token,
            }
        })),
    ))
}

/// Authenticates the admin and returns an access/refresh token pair.
/// Every successful login appends a new entry to the session list.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, created_at FROM users WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let (access_token, refresh_token) = issue_tokens(user.id, &state.config)?;

    record_session(
        &state.pool,
        user.id,
        &refresh_token,
        &client_ip(&headers, &addr),
        &user_agent(&headers),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "username": user.username,
            "accessToken": access_token,
            "refreshToken": refresh_token,
        }
    })))
}

/// Identity check for the admin dashboard.
pub async fn dashboard(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": {
            "username": user.username,
            "message": "Welcome to your dashboard",
        }
    }))
}

/// Confirms the presented token resolves to a live user.
pub async fn verify_auth(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Token is valid",
        "data": {
            "id": user.id,
            "username": user.username,
        }
    }))
}

/// Clears the auth cookie. Session rows are revoked through the session
/// registry, not here.
pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, CLEAR_COOKIE)]),
        Json(json!({ "success": true, "data": {} })),
    )
}

/// Changes the admin password after re-verifying the old one.
/// Existing sessions stay valid.
pub async fn update_password(
    State(pool): State<SqlitePool>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, created_at FROM users WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&payload.old_password, &user.password)? {
        return Err(AppError::AuthError("Invalid old password".to_string()));
    }

    if payload.old_password == payload.new_password {
        return Err(AppError::BadRequest(
            "New password must be different from the old password".to_string(),
        ));
    }

    let hashed_password = hash_password(&payload.new_password)?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(&hashed_password)
        .bind(user.id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password updated successfully",
    })))
}

/// Hard-deletes the calling user. Sessions cascade with the row.
pub async fn delete_account(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user.id)
        .execute(&pool)
        .await?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, CLEAR_COOKIE)]),
        Json(json!({
            "success": true,
            "message": "Account deleted successfully",
            "data": {}
        })),
    ))
}
