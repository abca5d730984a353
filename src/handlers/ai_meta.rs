// src/handlers/ai_meta.rs
//
// Thin pass-through to an external text-generation endpoint: send a fixed
// prompt embedding the blog content, try to parse the model's text output as
// JSON. No retry, no caching.

use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMetaRequest {
    pub blog_content: String,
}

/// The constrained shape the model is instructed to answer with.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogMeta {
    pub titles: Vec<String>,
    pub meta_description: String,
    pub seo_tags: Vec<String>,
}

fn build_prompt(blog_content: &str) -> String {
    format!(
        r#"
You are a professional blog writer and SEO expert. Based on the blog content below, generate:
1. 3 catchy titles
2. A compelling meta description (max 160 characters)
3. 5 SEO tags

Respond strictly in JSON format like this:
{{
  "titles": ["Title 1", "Title 2", "Title 3"],
  "metaDescription": "Your short meta description here",
  "seoTags": ["tag1", "tag2", "tag3", "tag4", "tag5"]
}}

Blog Content:
"""{}"""
"#,
        blog_content
    )
}

pub async fn generate_blog_meta(
    State(state): State<AppState>,
    Json(payload): Json<GenerateMetaRequest>,
) -> Result<impl IntoResponse, AppError> {
    let body = json!({
        "model": "command-r-plus",
        "prompt": build_prompt(&payload.blog_content),
        "max_tokens": 300,
        "temperature": 0.7,
    });

    let mut request = state.http.post(&state.config.ai_api_url).json(&body);
    if let Some(key) = &state.config.ai_api_key {
        request = request.bearer_auth(key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to generate blog meta: {}", e)))?;

    let data: serde_json::Value = response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to generate blog meta: {}", e)))?;

    let raw = data["generations"][0]["text"]
        .as_str()
        .ok_or_else(|| {
            AppError::Upstream("Unexpected response shape from AI endpoint".to_string())
        })?
        .trim()
        .to_string();

    let meta: BlogMeta =
        serde_json::from_str(&raw).map_err(|_| AppError::UpstreamParse { raw })?;

    Ok(Json(meta))
}
