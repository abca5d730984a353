// src/handlers/member.rs
//
// Credential set for approved community members: a separate collection from
// the admin users, with its own signup/login and a single protected page.

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{AuthUser, LoginRequest, SignupRequest, User},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{SCOPE_MEMBER, sign_jwt},
    },
};

/// Member tokens are plain access tokens with a one-day lifetime.
const MEMBER_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let created_at = chrono::Utc::now();

    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO request_users (username, password, created_at) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(created_at)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            AppError::Conflict("Username already taken".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    let token = sign_jwt(
        user_id,
        &state.config.jwt_secret,
        MEMBER_TOKEN_TTL_SECS,
        SCOPE_MEMBER,
        None,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Signup successful",
            "token": token,
            "user": {
                "id": user_id,
                "username": payload.username,
                "createdAt": created_at,
            }
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, created_at FROM request_users WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &state.config.jwt_secret,
        MEMBER_TOKEN_TTL_SECS,
        SCOPE_MEMBER,
        None,
    )?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": {
            "id": user.id,
            "username": user.username,
        }
    })))
}

pub async fn dashboard(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    Json(json!({
        "message": "Dashboard data",
        "data": {
            "username": user.username,
            "joinedOn": user.created_at,
            "customMessage": format!("Welcome back, {}!", user.username),
        }
    }))
}
