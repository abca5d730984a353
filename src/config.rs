// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,

    /// Secret for short-lived access tokens.
    pub jwt_secret: String,
    /// Distinct secret for long-lived refresh tokens.
    pub jwt_refresh_secret: String,
    /// Access token lifetime in seconds (default: 15 minutes).
    pub jwt_expiration: u64,
    /// Refresh token lifetime in seconds (default: 7 days).
    pub jwt_refresh_expiration: u64,

    pub rust_log: String,

    /// Optional admin credentials seeded at startup.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// External text-generation endpoint (Cohere-style /v1/generate).
    pub ai_api_url: String,
    pub ai_api_key: Option<String>,

    /// SMTP settings for the OTP mailer. When unset, emails are logged
    /// instead of sent.
    pub smtp_host: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_refresh_secret =
            env::var("JWT_REFRESH_SECRET").expect("JWT_REFRESH_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15 * 60);

        let jwt_refresh_expiration = env::var("JWT_REFRESH_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7 * 24 * 60 * 60);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let ai_api_url = env::var("AI_API_URL")
            .unwrap_or_else(|_| "https://api.cohere.ai/v1/generate".to_string());

        let mail_from = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Daily Blogs Community Team <noreply@localhost>".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_refresh_secret,
            jwt_expiration,
            jwt_refresh_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            ai_api_url,
            ai_api_key: env::var("AI_API_KEY").ok(),
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_user: env::var("SMTP_USER").ok(),
            smtp_pass: env::var("SMTP_PASS").ok(),
            mail_from,
        }
    }
}
