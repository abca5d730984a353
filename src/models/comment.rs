// src/models/comment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Moderation states. A comment is created pending and moved to approved or
/// rejected by an admin; it never reverts automatically.
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";

/// Represents the 'comments' table, keyed by (post_id, id).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub text: String,
    pub status: String,
    pub admin_response: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a comment (public, no auth).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 50, message = "Name cannot exceed 50 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 500, message = "Comment cannot exceed 500 characters"))]
    pub text: String,
}

/// A pending comment annotated with its parent post, as shown on the admin
/// moderation dashboard.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingComment {
    pub post_id: i64,
    pub post_title: String,
    pub comment_id: i64,
    pub name: String,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Per-post approved-comment count, used for the histogram view.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerBlogCommentCount {
    pub title: String,
    pub comment_count: i64,
}
