use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::queries::notifications as queries;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub created_at_ms: i64,
}

fn row_to_notification(row: &SqliteRow) -> Result<Notification, ApiError> {
    let payload: String = row.try_get(3)?;
    Ok(Notification {
        id: row.try_get(0)?,
        user_id: row.try_get(1)?,
        kind: row.try_get(2)?,
        payload: serde_json::from_str(&payload)?,
        is_read: row.try_get::<i64, _>(4)? != 0,
        created_at_ms: row.try_get(5)?,
    })
}

/// Record an event for a user
pub async fn notify(
    pool: &SqlitePool,
    user_id: &str,
    kind: &str,
    payload: &serde_json::Value,
) -> Result<Notification, ApiError> {
    let id = Uuid::new_v4().to_string();
    let now_ms = Utc::now().timestamp_millis();
    let payload_json = serde_json::to_string(payload)?;

    sqlx::query(&queries::insert(&id, user_id, kind, &payload_json, now_ms))
        .execute(pool)
        .await?;

    Ok(Notification {
        id,
        user_id: user_id.to_string(),
        kind: kind.to_string(),
        payload: payload.clone(),
        is_read: false,
        created_at_ms: now_ms,
    })
}

/// The caller's notifications, newest first
pub async fn list(
    pool: &SqlitePool,
    user_id: &str,
    unread_only: bool,
) -> Result<Vec<Notification>, ApiError> {
    let rows = sqlx::query(&queries::select_by_user(user_id, unread_only))
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_notification).collect()
}

/// Mark one notification read; scoped to the owner so foreign ids are a no-op
pub async fn mark_read(pool: &SqlitePool, user_id: &str, id: &str) -> Result<bool, ApiError> {
    let result = sqlx::query(&queries::mark_read(id, user_id))
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Mark every notification of the caller read; returns how many changed
pub async fn mark_all_read(pool: &SqlitePool, user_id: &str) -> Result<u64, ApiError> {
    let result = sqlx::query(&queries::mark_all_read(user_id))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
