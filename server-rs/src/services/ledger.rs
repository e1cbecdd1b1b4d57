//! The only code path allowed to change `users.eco_coins`.
//!
//! Both operations run inside a caller-supplied [`UnitOfWork`] and append a
//! `ledger_entries` row with the resulting balance.

use uuid::Uuid;

use crate::db::UnitOfWork;
use crate::error::{AppError, AppResult};
use crate::models::ledger::LedgerKind;

/// Adds `amount` to the user's balance. Returns the new balance.
pub async fn credit(
    uow: &mut UnitOfWork,
    user_id: Uuid,
    amount: i64,
    kind: LedgerKind,
    reference_id: Uuid,
) -> AppResult<i64> {
    if amount < 0 {
        return Err(AppError::Internal(format!("negative credit of {amount}")));
    }

    let balance: Option<i64> = sqlx::query_scalar(
        "UPDATE users SET eco_coins = eco_coins + $1, updated_at = NOW() WHERE id = $2 AND eco_coins <= $3 RETURNING eco_coins",
    )
    .bind(amount)
    .bind(user_id)
    .bind(i64::MAX - amount)
    .fetch_optional(uow.conn())
    .await?;

    let balance = match balance {
        Some(b) => b,
        None => {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(uow.conn())
                .await?;
            return Err(if exists {
                AppError::BadRequest("Balance limit reached".into())
            } else {
                AppError::NotFound("User not found".into())
            });
        }
    };

    record(uow, user_id, amount, balance, kind, reference_id).await?;
    Ok(balance)
}

/// Removes `amount` from the user's balance, refusing to go below zero.
/// Returns the new balance.
pub async fn debit(
    uow: &mut UnitOfWork,
    user_id: Uuid,
    amount: i64,
    kind: LedgerKind,
    reference_id: Uuid,
) -> AppResult<i64> {
    if amount < 0 {
        return Err(AppError::Internal(format!("negative debit of {amount}")));
    }

    let balance: Option<i64> = sqlx::query_scalar(
        "UPDATE users SET eco_coins = eco_coins - $1, updated_at = NOW() WHERE id = $2 AND eco_coins >= $1 RETURNING eco_coins",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(uow.conn())
    .await?;

    let balance = match balance {
        Some(b) => b,
        None => {
            let available: i64 = sqlx::query_scalar("SELECT eco_coins FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(uow.conn())
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".into()))?;
            return Err(AppError::InsufficientBalance {
                required: amount,
                available,
            });
        }
    };

    record(uow, user_id, -amount, balance, kind, reference_id).await?;
    Ok(balance)
}

async fn record(
    uow: &mut UnitOfWork,
    user_id: Uuid,
    amount: i64,
    balance_after: i64,
    kind: LedgerKind,
    reference_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO ledger_entries (user_id, amount, balance_after, kind, reference_id, created_at) VALUES ($1, $2, $3, $4, $5, NOW())",
    )
    .bind(user_id)
    .bind(amount)
    .bind(balance_after)
    .bind(kind)
    .bind(reference_id)
    .execute(uow.conn())
    .await?;
    Ok(())
}
