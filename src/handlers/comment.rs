// src/handlers/comment.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{
        Comment, CreateCommentRequest, PendingComment, PerBlogCommentCount, STATUS_APPROVED,
        STATUS_PENDING, STATUS_REJECTED,
    },
};

fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

async fn ensure_post_exists(pool: &SqlitePool, post_id: i64) -> Result<(), AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await?;

    exists
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

/// Submits a comment. Public endpoint; every new comment starts pending and
/// stays invisible until an admin approves it.
pub async fn add_comment(
    State(pool): State<SqlitePool>,
    Path(post_id): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let post_id = parse_id(&post_id, "Post")?;
    ensure_post_exists(&pool, post_id).await?;

    sqlx::query(
        "INSERT INTO comments (post_id, name, text, status, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(post_id)
    .bind(&payload.name)
    .bind(&payload.text)
    .bind(STATUS_PENDING)
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment submitted for approval" })),
    ))
}

/// All pending comments across every post, annotated with the parent post,
/// for the admin moderation dashboard.
pub async fn get_pending_comments(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let pending = sqlx::query_as::<_, PendingComment>(
        r#"
        SELECT c.post_id, p.title AS post_title, c.id AS comment_id,
               c.name, c.text, c.created_at
        FROM comments c
        JOIN posts p ON p.id = c.post_id
        WHERE c.status = ?
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(STATUS_PENDING)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "pendingComments": pending })))
}

/// Approved comments for one post. Public.
pub async fn get_approved_comments(
    State(pool): State<SqlitePool>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = parse_id(&post_id, "Post")?;
    ensure_post_exists(&pool, post_id).await?;

    let approved = sqlx::query_as::<_, Comment>(
        "SELECT id, post_id, name, text, status, admin_response, created_at \
         FROM comments WHERE post_id = ? AND status = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(post_id)
    .bind(STATUS_APPROVED)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "approvedComments": approved })))
}

/// Single-statement status transition; the last transition wins.
async fn set_comment_status(
    pool: &SqlitePool,
    post_id: &str,
    comment_id: &str,
    status: &str,
) -> Result<(), AppError> {
    let post_id = parse_id(post_id, "Post")?;
    let comment_id = parse_id(comment_id, "Comment")?;

    ensure_post_exists(pool, post_id).await?;

    let result = sqlx::query("UPDATE comments SET status = ? WHERE id = ? AND post_id = ?")
        .bind(status)
        .bind(comment_id)
        .bind(post_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    Ok(())
}

pub async fn approve_comment(
    State(pool): State<SqlitePool>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    set_comment_status(&pool, &post_id, &comment_id, STATUS_APPROVED).await?;
    Ok(Json(json!({ "message": "Comment approved" })))
}

pub async fn reject_comment(
    State(pool): State<SqlitePool>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    set_comment_status(&pool, &post_id, &comment_id, STATUS_REJECTED).await?;
    Ok(Json(json!({ "message": "Comment rejected" })))
}

/// Total comment count across the whole system, all statuses included.
pub async fn total_comments(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({ "totalComments": total })))
}

/// Approved-comment count per post, for the histogram view. Posts with no
/// approved comments still appear with a zero count.
pub async fn approved_comments_per_blog(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let counts = sqlx::query_as::<_, PerBlogCommentCount>(
        r#"
        SELECT p.title, COUNT(c.id) AS comment_count
        FROM posts p
        LEFT JOIN comments c ON c.post_id = p.id AND c.status = ?
        GROUP BY p.id
        ORDER BY p.id ASC
        "#,
    )
    .bind(STATUS_APPROVED)
    .fetch_all(&pool)
    .await?;

    Ok(Json(counts))
}
