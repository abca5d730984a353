// src/handlers/post.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::Rng;
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        comment::Comment,
        post::{CreatePostRequest, Post, PostListParams, UpdatePostRequest},
    },
    utils::html::clean_html,
};

const POST_COLUMNS: &str = "id, title, excerpt, content, date, author, read_time, category, \
                            slug, featured_image, tags, views, created_at, updated_at";

/// A malformed identifier is treated the same as an unknown one.
fn parse_post_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::NotFound("Post not found".to_string()))
}

async fn fetch_post(pool: &SqlitePool, id: i64) -> Result<Post, AppError> {
    let query = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);

    sqlx::query_as::<_, Post>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

fn push_list_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, params: &'a PostListParams) {
    if let Some(category) = &params.category {
        builder.push(" AND category = ").push_bind(category);
    }

    if let Some(search) = &params.search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR excerpt LIKE ")
            .push_bind(pattern.clone())
            .push(" OR content LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Lists posts newest-first with optional category filter and keyword search,
/// paginated with a 1-based page index.
pub async fn get_posts(
    State(pool): State<SqlitePool>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * limit;

    let mut list = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM posts WHERE 1 = 1",
        POST_COLUMNS
    ));
    push_list_filters(&mut list, &params);
    list.push(" ORDER BY date DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let posts = list.build_query_as::<Post>().fetch_all(&pool).await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts WHERE 1 = 1");
    push_list_filters(&mut count, &params);
    let total: i64 = count.build_query_scalar().fetch_one(&pool).await?;

    Ok(Json(json!({
        "posts": posts,
        "totalPages": (total + limit - 1) / limit,
        "currentPage": page,
    })))
}

/// Fetches one post including its full comment list.
pub async fn get_post(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_post_id(&id)?;
    let post = fetch_post(&pool, id).await?;

    let comments = sqlx::query_as::<_, Comment>(
        "SELECT id, post_id, name, text, status, admin_response, created_at \
         FROM comments WHERE post_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let mut body = serde_json::to_value(&post)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    body["comments"] = serde_json::to_value(&comments)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(body))
}

/// Creates a post. `readTime` defaults to a random value in [3, 10] when the
/// payload omits it; content is sanitized before storage.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let read_time = payload
        .read_time
        .unwrap_or_else(|| rand::thread_rng().gen_range(3..=10));

    let now = chrono::Utc::now();
    let tags = sqlx::types::Json(payload.tags.unwrap_or_default());

    let post_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO posts (title, excerpt, content, date, author, read_time, category,
                           slug, featured_image, tags, views, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'Admin', ?, ?, ?, ?, ?, 0, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.excerpt)
    .bind(clean_html(&payload.content))
    .bind(now)
    .bind(read_time)
    .bind(&payload.category)
    .bind(&payload.slug)
    .bind(&payload.featured_image)
    .bind(tags)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            AppError::Conflict("Slug must be unique".to_string())
        } else {
            tracing::error!("Failed to create post: {:?}", e);
            AppError::from(e)
        }
    })?;

    let post = fetch_post(&pool, post_id).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Partial update: only supplied fields overwrite the stored post.
pub async fn update_post(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = parse_post_id(&id)?;
    let existing = fetch_post(&pool, id).await?;

    let title = payload.title.unwrap_or(existing.title);
    let excerpt = payload.excerpt.unwrap_or(existing.excerpt);
    let content = payload
        .content
        .map(|c| clean_html(&c))
        .unwrap_or(existing.content);
    let read_time = payload.read_time.unwrap_or(existing.read_time);
    let category = payload.category.unwrap_or(existing.category);
    let slug = payload.slug.unwrap_or(existing.slug);
    let featured_image = payload.featured_image.or(existing.featured_image);
    let tags = payload
        .tags
        .map(sqlx::types::Json)
        .unwrap_or(existing.tags);

    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, excerpt = ?, content = ?, read_time = ?, category = ?,
            slug = ?, featured_image = ?, tags = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&title)
    .bind(&excerpt)
    .bind(&content)
    .bind(read_time)
    .bind(&category)
    .bind(&slug)
    .bind(&featured_image)
    .bind(tags)
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            AppError::Conflict("Slug must be unique".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    let post = fetch_post(&pool, id).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_post_id(&id)?;

    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    Ok(Json(json!({ "message": "Post removed" })))
}

/// Atomic view-count increment; returns the new count. Concurrent calls must
/// never lose an update, hence the single-statement form.
pub async fn increment_view(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_post_id(&id)?;

    let views: Option<i64> =
        sqlx::query_scalar("UPDATE posts SET views = views + 1 WHERE id = ? RETURNING views")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

    let views = views.ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;

    Ok(Json(json!({
        "message": "View incremented",
        "views": views,
    })))
}

/// Sum of view counters across every post.
pub async fn get_total_views(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(views), 0) FROM posts")
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({ "totalViews": total })))
}

pub async fn get_total_blogs(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await?;

    Ok(Json(json!({ "totalBlogs": count })))
}

/// Up to 4 other posts sharing the category of the given post.
pub async fn get_related_posts(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_post_id(&id)?;

    let category: Option<String> = sqlx::query_scalar("SELECT category FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let category = category.ok_or_else(|| AppError::NotFound("Blog not found".to_string()))?;

    let query = format!(
        "SELECT {} FROM posts WHERE category = ? AND id != ? ORDER BY date DESC LIMIT 4",
        POST_COLUMNS
    );

    let related = sqlx::query_as::<_, Post>(&query)
        .bind(&category)
        .bind(id)
        .fetch_all(&pool)
        .await?;

    Ok(Json(related))
}
