//! Fixed-window rate limiting backed by the rate_limit_hits table
//!
//! A request is allowed while fewer than `max_requests` hits exist in the
//! trailing window; the hit is recorded only when allowed, so rejected
//! requests do not extend the window.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::queries::rate_limit as queries;

pub async fn check_and_record(
    pool: &SqlitePool,
    user_id: &str,
    bucket: &str,
    max_requests: i64,
    window_secs: i64,
) -> Result<(), ApiError> {
    let now_ms = Utc::now().timestamp_millis();
    let window_ms = window_secs * 1000;
    let window_start_ms = now_ms - window_ms;

    let count: i64 = sqlx::query_scalar(&queries::count_in_window(
        user_id,
        bucket,
        window_start_ms,
    ))
    .fetch_one(pool)
    .await?;

    if count >= max_requests {
        let earliest: Option<i64> = sqlx::query_scalar(&queries::earliest_in_window(
            user_id,
            bucket,
            window_start_ms,
        ))
        .fetch_one(pool)
        .await?;
        let reset_at_ms = earliest.unwrap_or(now_ms) + window_ms;
        return Err(ApiError::RateLimited { reset_at_ms });
    }

    sqlx::query(&queries::insert_hit(user_id, bucket, now_ms))
        .execute(pool)
        .await?;

    // Hits older than two windows can never influence a decision again
    sqlx::query(&queries::prune_before(now_ms - 2 * window_ms))
        .execute(pool)
        .await?;

    Ok(())
}
