use sea_query::{Expr, Func, Query, SqliteQueryBuilder};

use crate::schema::RateLimitHits;

/// INSERT INTO rate_limit_hits (user_id, bucket, requested_at_ms) VALUES (?, ?, ?)
pub fn insert_hit(user_id: &str, bucket: &str, requested_at_ms: i64) -> String {
    Query::insert()
        .into_table(RateLimitHits::Table)
        .columns([
            RateLimitHits::UserId,
            RateLimitHits::Bucket,
            RateLimitHits::RequestedAtMs,
        ])
        .values_panic([user_id.into(), bucket.into(), requested_at_ms.into()])
        .to_string(SqliteQueryBuilder)
}

/// SELECT COUNT(*) FROM rate_limit_hits
/// WHERE user_id = ? AND bucket = ? AND requested_at_ms > ?
pub fn count_in_window(user_id: &str, bucket: &str, window_start_ms: i64) -> String {
    Query::select()
        .expr(Func::count(Expr::col(RateLimitHits::Id)))
        .from(RateLimitHits::Table)
        .and_where(Expr::col(RateLimitHits::UserId).eq(user_id))
        .and_where(Expr::col(RateLimitHits::Bucket).eq(bucket))
        .and_where(Expr::col(RateLimitHits::RequestedAtMs).gt(window_start_ms))
        .to_string(SqliteQueryBuilder)
}

/// SELECT MIN(requested_at_ms) FROM rate_limit_hits
/// WHERE user_id = ? AND bucket = ? AND requested_at_ms > ?
pub fn earliest_in_window(user_id: &str, bucket: &str, window_start_ms: i64) -> String {
    Query::select()
        .expr(Func::min(Expr::col(RateLimitHits::RequestedAtMs)))
        .from(RateLimitHits::Table)
        .and_where(Expr::col(RateLimitHits::UserId).eq(user_id))
        .and_where(Expr::col(RateLimitHits::Bucket).eq(bucket))
        .and_where(Expr::col(RateLimitHits::RequestedAtMs).gt(window_start_ms))
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM rate_limit_hits WHERE requested_at_ms <= ?
pub fn prune_before(cutoff_ms: i64) -> String {
    Query::delete()
        .from_table(RateLimitHits::Table)
        .and_where(Expr::col(RateLimitHits::RequestedAtMs).lte(cutoff_ms))
        .to_string(SqliteQueryBuilder)
}
