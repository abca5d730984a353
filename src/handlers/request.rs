// src/handlers/request.rs
//
// The "join the community" workflow: request access with an email, prove
// control of it with a 6-digit OTP inside a 10-minute window.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user_request::{JoinRequest, UserRequest, VerifyOtpRequest},
    state::AppState,
    utils::mail::{generate_otp, send_confirmation_email, send_otp_email},
};

const OTP_TTL_MINUTES: i64 = 10;

/// Creates a join request and emails a freshly generated OTP.
/// The OTP is never part of the response.
pub async fn create_request(
    State(state): State<AppState>,
    Json(payload): Json<JoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM user_requests WHERE email = ?")
        .bind(&payload.email)
        .fetch_optional(&state.pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "Email already exists, try using another email.".to_string(),
        ));
    }

    let otp = generate_otp();
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::minutes(OTP_TTL_MINUTES);

    sqlx::query(
        r#"
        INSERT INTO user_requests (email, full_name, reason, otp, otp_expires_at, is_verified, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&payload.email)
    .bind(&payload.full_name)
    .bind(&payload.reason)
    .bind(&otp)
    .bind(expires_at)
    .bind(now)
    .execute(&state.pool)
    .await?;

    send_otp_email(state.mailer.as_ref(), &payload.email, &otp).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "OTP sent to your email for verification." })),
    ))
}

/// Verifies the OTP for an email. On success the request becomes verified and
/// the OTP fields are cleared, so a replay of the same code fails.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = sqlx::query_as::<_, UserRequest>(
        r#"
        SELECT id, email, full_name, reason, otp, otp_expires_at, is_verified, created_at
        FROM user_requests
        WHERE email = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(&payload.email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    // Mismatch is reported before expiry, matching the original flow.
    if request.otp.as_deref() != Some(payload.otp.as_str()) {
        return Err(AppError::BadRequest("Invalid OTP".to_string()));
    }

    let expires_at = request
        .otp_expires_at
        .ok_or_else(|| AppError::BadRequest("Invalid OTP".to_string()))?;

    if chrono::Utc::now() > expires_at {
        return Err(AppError::BadRequest("OTP expired".to_string()));
    }

    sqlx::query(
        "UPDATE user_requests SET is_verified = 1, otp = NULL, otp_expires_at = NULL WHERE id = ?",
    )
    .bind(request.id)
    .execute(&state.pool)
    .await?;

    send_confirmation_email(state.mailer.as_ref(), &request.email, &request.full_name).await?;

    Ok(Json(json!({ "message": "Email verified successfully!" })))
}

/// One record per distinct email; when historical duplicates exist, the first
/// request wins.
pub async fn get_all_users(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, UserRequest>(
        r#"
        SELECT id, email, full_name, reason, otp, otp_expires_at, is_verified, created_at
        FROM user_requests
        WHERE id IN (SELECT MIN(id) FROM user_requests GROUP BY email)
        ORDER BY id ASC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(users))
}
