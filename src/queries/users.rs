use sea_query::{Expr, Query, SqliteQueryBuilder};

use crate::schema::Users;

/// INSERT INTO users (id, display_name, bearer_token, created_at_ms) VALUES (?, ?, ?, ?)
pub fn insert(id: &str, display_name: &str, bearer_token: &str, created_at_ms: i64) -> String {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Id,
            Users::DisplayName,
            Users::BearerToken,
            Users::CreatedAtMs,
        ])
        .values_panic([
            id.into(),
            display_name.into(),
            bearer_token.into(),
            created_at_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, display_name FROM users WHERE bearer_token = ?
pub fn select_by_token(bearer_token: &str) -> String {
    Query::select()
        .columns([Users::Id, Users::DisplayName])
        .from(Users::Table)
        .and_where(Expr::col(Users::BearerToken).eq(bearer_token))
        .to_string(SqliteQueryBuilder)
}
