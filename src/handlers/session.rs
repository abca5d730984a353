// src/handlers/session.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        session::{LogoutSessionRequest, Session},
        user::AuthUser,
    },
};

/// Lists the caller's active sessions, oldest first.
pub async fn get_sessions(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = sqlx::query_as::<_, Session>(
        r#"
        SELECT id, refresh_token, ip, user_agent, location, created_at, last_used
        FROM sessions
        WHERE user_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(sessions))
}

/// Revokes the single session matching the supplied refresh token.
/// Deliberately a no-op when nothing matches.
pub async fn logout_session(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<LogoutSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.refresh_token.is_empty() {
        return Err(AppError::BadRequest("Refresh token is required".to_string()));
    }

    sqlx::query("DELETE FROM sessions WHERE user_id = ? AND refresh_token = ?")
        .bind(user.id)
        .bind(&payload.refresh_token)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Logged out from selected session" })))
}

/// Clears the caller's entire session list: logout on every device. Already
/// issued access tokens stay valid until their own short expiry.
pub async fn logout_all_sessions(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user.id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Logged out from all sessions" })))
}
