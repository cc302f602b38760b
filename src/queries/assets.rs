use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::Assets;

/// INSERT INTO assets (id, user_id, storage_path, mime_type, status, created_at_ms)
/// VALUES (?, ?, ?, ?, ?, ?)
pub fn insert(
    id: &str,
    user_id: &str,
    storage_path: &str,
    mime_type: &str,
    status: &str,
    created_at_ms: i64,
) -> String {
    Query::insert()
        .into_table(Assets::Table)
        .columns([
            Assets::Id,
            Assets::UserId,
            Assets::StoragePath,
            Assets::MimeType,
            Assets::Status,
            Assets::CreatedAtMs,
        ])
        .values_panic([
            id.into(),
            user_id.into(),
            storage_path.into(),
            mime_type.into(),
            status.into(),
            created_at_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, user_id, storage_path, mime_type, status, duration_seconds, created_at_ms
/// FROM assets WHERE id = ?
pub fn select_by_id(id: &str) -> String {
    Query::select()
        .columns([
            Assets::Id,
            Assets::UserId,
            Assets::StoragePath,
            Assets::MimeType,
            Assets::Status,
            Assets::DurationSeconds,
            Assets::CreatedAtMs,
        ])
        .from(Assets::Table)
        .and_where(Expr::col(Assets::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT ... FROM assets WHERE user_id = ? ORDER BY created_at_ms DESC
pub fn select_by_user(user_id: &str) -> String {
    Query::select()
        .columns([
            Assets::Id,
            Assets::UserId,
            Assets::StoragePath,
            Assets::MimeType,
            Assets::Status,
            Assets::DurationSeconds,
            Assets::CreatedAtMs,
        ])
        .from(Assets::Table)
        .and_where(Expr::col(Assets::UserId).eq(user_id))
        .order_by(Assets::CreatedAtMs, Order::Desc)
        .to_string(SqliteQueryBuilder)
}

/// UPDATE assets SET status = ?, duration_seconds = COALESCE(?, duration_seconds) WHERE id = ?
pub fn update_status(id: &str, status: &str, duration_seconds: Option<f64>) -> String {
    let mut update = Query::update()
        .table(Assets::Table)
        .value(Assets::Status, status)
        .and_where(Expr::col(Assets::Id).eq(id))
        .to_owned();

    if let Some(duration) = duration_seconds {
        update.value(Assets::DurationSeconds, duration);
    }

    update.to_string(SqliteQueryBuilder)
}

/// SELECT storage_path FROM assets
pub fn select_all_storage_paths() -> String {
    Query::select()
        .column(Assets::StoragePath)
        .from(Assets::Table)
        .to_string(SqliteQueryBuilder)
}
