// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::user::AuthUser, state::AppState};

/// Admin and member ids live in separate tables that both count from 1, so a
/// bare numeric `sub` is ambiguous. Every token names its credential table via
/// `scope` and each guard accepts only its own.
pub const SCOPE_ADMIN: &str = "admin";
pub const SCOPE_MEMBER: &str = "member";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
    /// Credential table the subject id refers to ("admin" or "member").
    pub scope: String,
    /// Unique token id, set on refresh tokens only. Two logins in the same
    /// second must still produce distinct refresh tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

fn unix_now() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize)
}

/// Signs a JWT for the given user id with the given secret and lifetime.
pub fn sign_jwt(
    id: i64,
    secret: &str,
    expiration_seconds: u64,
    scope: &str,
    jti: Option<String>,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: id.to_string(),
        exp: unix_now()? + expiration_seconds as usize,
        scope: scope.to_string(),
        jti,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Issues the access/refresh token pair handed out on login and signup.
/// Access and refresh use distinct secrets and lifetimes.
pub fn issue_tokens(id: i64, config: &Config) -> Result<(String, String), AppError> {
    let access = sign_jwt(
        id,
        &config.jwt_secret,
        config.jwt_expiration,
        SCOPE_ADMIN,
        None,
    )?;
    let refresh = sign_jwt(
        id,
        &config.jwt_refresh_secret,
        config.jwt_refresh_expiration,
        SCOPE_ADMIN,
        Some(uuid::Uuid::new_v4().to_string()),
    )?;
    Ok((access, refresh))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Pulls the bearer token from the Authorization header, falling back to a
/// cookie named `token`.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())?
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("token=").map(str::to_string))
}

/// Axum Middleware: Authentication.
///
/// Validates the access token from the Authorization header (or `token`
/// cookie), loads the user it resolves to (password excluded) and injects it
/// into the request extensions. 401 with a JSON body on any failure.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = token_from_headers(req.headers()).ok_or_else(|| {
        AppError::AuthError("Not authorized to access this route (no token)".to_string())
    })?;

    let claims = verify_jwt(&token, &state.config.jwt_secret).map_err(|_| {
        AppError::AuthError("Not authorized to access this route (invalid token)".to_string())
    })?;

    if claims.scope != SCOPE_ADMIN {
        return Err(AppError::AuthError(
            "Not authorized to access this route (invalid token)".to_string(),
        ));
    }

    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    let user = sqlx::query_as::<_, AuthUser>(
        "SELECT id, username, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Axum Middleware: community member authentication.
///
/// Same contract as `auth_middleware`, but resolves against the separate
/// `request_users` credential set.
pub async fn member_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = token_from_headers(req.headers())
        .ok_or_else(|| AppError::AuthError("No token, authorization denied".to_string()))?;

    let claims = verify_jwt(&token, &state.config.jwt_secret)?;

    if claims.scope != SCOPE_MEMBER {
        return Err(AppError::AuthError("Invalid token".to_string()));
    }

    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    let user = sqlx::query_as::<_, AuthUser>(
        "SELECT id, username, created_at FROM request_users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::AuthError("User not found".to_string()))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
