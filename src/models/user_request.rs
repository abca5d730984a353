// src/models/user_request.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'user_requests' table: one "join the community" request.
/// The OTP fields are never serialized into responses.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub reason: String,
    #[serde(skip)]
    pub otp: Option<String>,
    #[serde(skip)]
    pub otp_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_verified: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a join request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,

    #[validate(length(min = 1, max = 500, message = "Reason is required"))]
    pub reason: String,
}

/// DTO for OTP verification.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,

    #[validate(length(min = 6, max = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}
