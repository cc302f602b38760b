//! Dracma ledger
//!
//! Balances are never written directly by handler code. Every change goes
//! through [`apply`], which inserts an immutable transaction row and
//! recomputes the balance in one SQL transaction, so the balance always
//! equals the sum of the user's deltas and can never go negative.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::queries::ledger as queries;

/// Reason recorded on the provisioning grant transaction
const GRANT_REASON: &str = "starting_grant";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub balance: i64,
    pub is_unlimited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    pub delta: i64,
    pub reason: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub created_at_ms: i64,
}

/// Provision a balance row with the starting grant on first contact
///
/// The grant is itself a ledger transaction so the sum-of-deltas invariant
/// holds from the very first row.
pub async fn ensure_balance(
    pool: &SqlitePool,
    user_id: &str,
    starting_grant: i64,
) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query(&queries::select_balance(user_id))
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    sqlx::query(&queries::insert_balance_if_missing(
        user_id,
        starting_grant,
        false,
    ))
    .execute(&mut *tx)
    .await?;

    if starting_grant != 0 {
        let now_ms = Utc::now().timestamp_millis();
        sqlx::query(&queries::insert_transaction(
            &Uuid::new_v4().to_string(),
            user_id,
            starting_grant,
            GRANT_REASON,
            None,
            None,
            now_ms,
        ))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Apply a delta to a user's balance through the ledger
///
/// Inserts the transaction row and recomputes the balance atomically. A
/// debit that would take a regular account below zero is rejected and
/// nothing is written. Unlimited accounts record the debit for the audit
/// trail but their stored balance floors at zero.
///
/// Returns the balance after the operation.
pub async fn apply(
    pool: &SqlitePool,
    user_id: &str,
    delta: i64,
    reason: &str,
    reference: Option<(&str, &str)>,
) -> Result<i64, ApiError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&queries::select_balance(user_id))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::NotFound("balance"))?;
    let balance: i64 = row.try_get(0)?;
    let is_unlimited: bool = row.try_get::<i64, _>(1)? != 0;

    let next = balance + delta;
    if next < 0 && !is_unlimited {
        return Err(ApiError::InsufficientBalance);
    }
    let stored = next.max(0);

    let now_ms = Utc::now().timestamp_millis();
    let (reference_type, reference_id) = match reference {
        Some((kind, id)) => (Some(kind), Some(id)),
        None => (None, None),
    };

    sqlx::query(&queries::insert_transaction(
        &Uuid::new_v4().to_string(),
        user_id,
        delta,
        reason,
        reference_type,
        reference_id,
        now_ms,
    ))
    .execute(&mut *tx)
    .await?;

    sqlx::query(&queries::update_balance(user_id, stored))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(stored)
}

/// Current balance, provisioning the row if needed
pub async fn balance(
    pool: &SqlitePool,
    user_id: &str,
    starting_grant: i64,
) -> Result<BalanceView, ApiError> {
    ensure_balance(pool, user_id, starting_grant).await?;

    let row = sqlx::query(&queries::select_balance(user_id))
        .fetch_one(pool)
        .await?;

    Ok(BalanceView {
        balance: row.try_get(0)?,
        is_unlimited: row.try_get::<i64, _>(1)? != 0,
    })
}

/// Ledger entries for a user, newest first
pub async fn transactions(pool: &SqlitePool, user_id: &str) -> Result<Vec<LedgerEntry>, ApiError> {
    let rows = sqlx::query(&queries::select_transactions_by_user(user_id))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(LedgerEntry {
                id: row.try_get(0)?,
                user_id: row.try_get(1)?,
                delta: row.try_get(2)?,
                reason: row.try_get(3)?,
                reference_type: row.try_get(4)?,
                reference_id: row.try_get(5)?,
                created_at_ms: row.try_get(6)?,
            })
        })
        .collect()
}

/// Return the debit recorded against a failed job
///
/// No-op when no debit exists (e.g. the job was submitted while pricing
/// was zero). Terminal-state freezing upstream guarantees this runs at
/// most once per job.
pub async fn refund(
    pool: &SqlitePool,
    user_id: &str,
    reference_type: &str,
    reference_id: &str,
) -> Result<(), ApiError> {
    let debit: Option<i64> = sqlx::query_scalar(&queries::select_debit_for_reference(
        user_id,
        reference_type,
        reference_id,
    ))
    .fetch_optional(pool)
    .await?;

    if let Some(delta) = debit {
        apply(
            pool,
            user_id,
            -delta,
            "refund",
            Some((reference_type, reference_id)),
        )
        .await?;
    }
    Ok(())
}

/// Flip the unlimited flag on an account (service-level operation)
pub async fn set_unlimited(
    pool: &SqlitePool,
    user_id: &str,
    is_unlimited: bool,
    starting_grant: i64,
) -> Result<(), ApiError> {
    ensure_balance(pool, user_id, starting_grant).await?;
    sqlx::query(&queries::update_unlimited_flag(user_id, is_unlimited))
        .execute(pool)
        .await?;
    Ok(())
}
