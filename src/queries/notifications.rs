use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::Notifications;

/// INSERT INTO notifications (id, user_id, kind, payload, is_read, created_at_ms)
/// VALUES (?, ?, ?, ?, 0, ?)
pub fn insert(id: &str, user_id: &str, kind: &str, payload: &str, created_at_ms: i64) -> String {
    Query::insert()
        .into_table(Notifications::Table)
        .columns([
            Notifications::Id,
            Notifications::UserId,
            Notifications::Kind,
            Notifications::Payload,
            Notifications::IsRead,
            Notifications::CreatedAtMs,
        ])
        .values_panic([
            id.into(),
            user_id.into(),
            kind.into(),
            payload.into(),
            0.into(),
            created_at_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, user_id, kind, payload, is_read, created_at_ms FROM notifications
/// WHERE user_id = ? [AND is_read = 0] ORDER BY created_at_ms DESC
pub fn select_by_user(user_id: &str, unread_only: bool) -> String {
    let mut select = Query::select()
        .columns([
            Notifications::Id,
            Notifications::UserId,
            Notifications::Kind,
            Notifications::Payload,
            Notifications::IsRead,
            Notifications::CreatedAtMs,
        ])
        .from(Notifications::Table)
        .and_where(Expr::col(Notifications::UserId).eq(user_id))
        .order_by(Notifications::CreatedAtMs, Order::Desc)
        .to_owned();

    if unread_only {
        select.and_where(Expr::col(Notifications::IsRead).eq(0));
    }

    select.to_string(SqliteQueryBuilder)
}

/// UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?
pub fn mark_read(id: &str, user_id: &str) -> String {
    Query::update()
        .table(Notifications::Table)
        .value(Notifications::IsRead, 1)
        .and_where(Expr::col(Notifications::Id).eq(id))
        .and_where(Expr::col(Notifications::UserId).eq(user_id))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE notifications SET is_read = 1 WHERE user_id = ?
pub fn mark_all_read(user_id: &str) -> String {
    Query::update()
        .table(Notifications::Table)
        .value(Notifications::IsRead, 1)
        .and_where(Expr::col(Notifications::UserId).eq(user_id))
        .to_string(SqliteQueryBuilder)
}
