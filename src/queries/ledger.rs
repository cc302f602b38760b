use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};

use crate::schema::{Balances, DracmaTransactions};

/// INSERT INTO balances (user_id, balance, is_unlimited) VALUES (?, ?, ?)
/// ON CONFLICT (user_id) DO NOTHING
pub fn insert_balance_if_missing(user_id: &str, balance: i64, is_unlimited: bool) -> String {
    Query::insert()
        .into_table(Balances::Table)
        .columns([Balances::UserId, Balances::Balance, Balances::IsUnlimited])
        .values_panic([
            user_id.into(),
            balance.into(),
            (is_unlimited as i32).into(),
        ])
        .on_conflict(OnConflict::column(Balances::UserId).do_nothing().to_owned())
        .to_string(SqliteQueryBuilder)
}

/// SELECT balance, is_unlimited FROM balances WHERE user_id = ?
pub fn select_balance(user_id: &str) -> String {
    Query::select()
        .columns([Balances::Balance, Balances::IsUnlimited])
        .from(Balances::Table)
        .and_where(Expr::col(Balances::UserId).eq(user_id))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE balances SET balance = ? WHERE user_id = ?
pub fn update_balance(user_id: &str, balance: i64) -> String {
    Query::update()
        .table(Balances::Table)
        .value(Balances::Balance, balance)
        .and_where(Expr::col(Balances::UserId).eq(user_id))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE balances SET is_unlimited = ? WHERE user_id = ?
pub fn update_unlimited_flag(user_id: &str, is_unlimited: bool) -> String {
    Query::update()
        .table(Balances::Table)
        .value(Balances::IsUnlimited, is_unlimited as i32)
        .and_where(Expr::col(Balances::UserId).eq(user_id))
        .to_string(SqliteQueryBuilder)
}

/// INSERT INTO dracma_transactions (id, user_id, delta, reason, reference_type, reference_id,
/// created_at_ms) VALUES (?, ?, ?, ?, ?, ?, ?)
pub fn insert_transaction(
    id: &str,
    user_id: &str,
    delta: i64,
    reason: &str,
    reference_type: Option<&str>,
    reference_id: Option<&str>,
    created_at_ms: i64,
) -> String {
    Query::insert()
        .into_table(DracmaTransactions::Table)
        .columns([
            DracmaTransactions::Id,
            DracmaTransactions::UserId,
            DracmaTransactions::Delta,
            DracmaTransactions::Reason,
            DracmaTransactions::ReferenceType,
            DracmaTransactions::ReferenceId,
            DracmaTransactions::CreatedAtMs,
        ])
        .values_panic([
            id.into(),
            user_id.into(),
            delta.into(),
            reason.into(),
            reference_type.map(str::to_string).into(),
            reference_id.map(str::to_string).into(),
            created_at_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, user_id, delta, reason, reference_type, reference_id, created_at_ms
/// FROM dracma_transactions WHERE user_id = ? ORDER BY created_at_ms DESC
pub fn select_transactions_by_user(user_id: &str) -> String {
    Query::select()
        .columns([
            DracmaTransactions::Id,
            DracmaTransactions::UserId,
            DracmaTransactions::Delta,
            DracmaTransactions::Reason,
            DracmaTransactions::ReferenceType,
            DracmaTransactions::ReferenceId,
            DracmaTransactions::CreatedAtMs,
        ])
        .from(DracmaTransactions::Table)
        .and_where(Expr::col(DracmaTransactions::UserId).eq(user_id))
        .order_by(DracmaTransactions::CreatedAtMs, Order::Desc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT delta FROM dracma_transactions
/// WHERE user_id = ? AND reference_type = ? AND reference_id = ? AND delta < 0
pub fn select_debit_for_reference(
    user_id: &str,
    reference_type: &str,
    reference_id: &str,
) -> String {
    Query::select()
        .column(DracmaTransactions::Delta)
        .from(DracmaTransactions::Table)
        .and_where(Expr::col(DracmaTransactions::UserId).eq(user_id))
        .and_where(Expr::col(DracmaTransactions::ReferenceType).eq(reference_type))
        .and_where(Expr::col(DracmaTransactions::ReferenceId).eq(reference_id))
        .and_where(Expr::col(DracmaTransactions::Delta).lt(0))
        .to_string(SqliteQueryBuilder)
}
