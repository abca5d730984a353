// src/models/post.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

/// The fixed set of post categories.
pub const CATEGORIES: [&str; 10] = [
    "Development",
    "Design",
    "DevOps",
    "Data Science",
    "Machine Learning",
    "Cybersecurity",
    "Blockchain",
    "Mobile Development",
    "Web Development",
    "Cloud Computing",
];

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

fn validate_category(category: &str) -> Result<(), ValidationError> {
    if CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(ValidationError::new("category").with_message("Unknown category".into()))
    }
}

/// Represents the 'posts' table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub date: chrono::DateTime<chrono::Utc>,
    pub author: String,
    /// Estimated read time in minutes, bounded 3-10.
    pub read_time: i64,
    pub category: String,
    /// Unique human-readable identifier, used by the frontend in URLs.
    pub slug: String,
    pub featured_image: Option<String>,
    pub tags: sqlx::types::Json<Vec<String>>,
    pub views: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 100, message = "Title cannot exceed 100 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 200, message = "Excerpt cannot exceed 200 characters"))]
    pub excerpt: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    /// Defaults to a random value in [3, 10] when omitted.
    #[validate(range(min = 3, max = 10, message = "Read time must be between 3 and 10 minutes"))]
    pub read_time: Option<i64>,

    #[validate(custom(function = validate_category))]
    pub category: String,

    #[validate(regex(
        path = *SLUG_RE,
        message = "Slug may only contain lowercase letters, digits and hyphens"
    ))]
    pub slug: String,

    #[validate(url(message = "featuredImage must be a valid URL"))]
    pub featured_image: Option<String>,

    pub tags: Option<Vec<String>>,
}

/// DTO for partial post updates: only supplied fields overwrite.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 100, message = "Title cannot exceed 100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Excerpt cannot exceed 200 characters"))]
    pub excerpt: Option<String>,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: Option<String>,

    #[validate(range(min = 3, max = 10, message = "Read time must be between 3 and 10 minutes"))]
    pub read_time: Option<i64>,

    #[validate(custom(function = validate_category))]
    pub category: Option<String>,

    #[validate(regex(
        path = *SLUG_RE,
        message = "Slug may only contain lowercase letters, digits and hyphens"
    ))]
    pub slug: Option<String>,

    #[validate(url(message = "featuredImage must be a valid URL"))]
    pub featured_image: Option<String>,

    pub tags: Option<Vec<String>>,
}

/// Query parameters for listing posts.
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// Exact-match category filter.
    pub category: Option<String>,

    /// Keyword search across title / excerpt / content.
    pub search: Option<String>,

    /// 1-based page index (default: 1).
    pub page: Option<i64>,

    /// Page size (default: 10, max: 100).
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_regex_accepts_kebab_case_only() {
        assert!(SLUG_RE.is_match("my-first-post"));
        assert!(SLUG_RE.is_match("post2"));
        assert!(!SLUG_RE.is_match("My Post"));
        assert!(!SLUG_RE.is_match("-leading"));
        assert!(!SLUG_RE.is_match("trailing-"));
    }

    #[test]
    fn category_must_be_one_of_the_fixed_set() {
        assert!(validate_category("DevOps").is_ok());
        assert!(validate_category("Gardening").is_err());
    }
}
