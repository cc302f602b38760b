use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::constants::generate_bearer_token;
use crate::error::ApiError;
use crate::queries::users;

/// A caller resolved from its bearer token
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub display_name: String,
}

/// Extract the bearer token from an Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the calling user or fail with AUTH_401
pub async fn authenticate(pool: &SqlitePool, headers: &HeaderMap) -> Result<AuthedUser, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;

    let row = sqlx::query(&users::select_by_token(token))
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(AuthedUser {
        id: row.try_get(0)?,
        display_name: row.try_get(1)?,
    })
}

/// Require the service-level credential, rejecting all other callers
///
/// Used by the cleanup sweep, the stale-job sweep and worker callbacks.
pub fn require_service_token(expected: &str, headers: &HeaderMap) -> Result<(), ApiError> {
    match bearer_token(headers) {
        Some(token) if token == expected => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}

/// Provision a user account and return (user id, bearer token)
pub async fn create_user(
    pool: &SqlitePool,
    display_name: &str,
) -> Result<(String, String), ApiError> {
    let id = Uuid::new_v4().to_string();
    let token = generate_bearer_token();
    let now_ms = Utc::now().timestamp_millis();

    sqlx::query(&users::insert(&id, display_name, &token, now_ms))
        .execute(pool)
        .await?;

    Ok((id, token))
}
