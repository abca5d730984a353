// src/models/session.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One active login: a refresh token plus the device metadata captured when
/// it was issued. A user may hold any number of these, one per device.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub refresh_token: String,
    pub ip: String,
    pub user_agent: String,
    pub location: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_used: chrono::DateTime<chrono::Utc>,
}

/// DTO for revoking a single session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutSessionRequest {
    pub refresh_token: String,
}
