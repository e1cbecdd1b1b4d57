use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::user::Tier;

/// Re-derives one user's tier from their balance. Writes only on change.
pub async fn reconcile(db: &PgPool, user_id: Uuid) -> AppResult<Tier> {
    let (eco_coins, current): (i64, Tier) =
        sqlx::query_as("SELECT eco_coins, tier FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let derived = Tier::for_balance(eco_coins);
    if derived != current {
        sqlx::query("UPDATE users SET tier = $1, updated_at = NOW() WHERE id = $2")
            .bind(derived)
            .bind(user_id)
            .execute(db)
            .await?;
        tracing::info!(%user_id, from = ?current, to = ?derived, eco_coins, "Tier changed");
    }
    Ok(derived)
}

/// Post-commit reconciliation. Failure is logged, never surfaced: the ledger
/// change that triggered it has already committed, and the next reconcile
/// (or an admin repair pass) will converge.
pub async fn reconcile_best_effort(db: &PgPool, user_id: Uuid) -> Option<Tier> {
    match reconcile(db, user_id).await {
        Ok(tier) => Some(tier),
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "Tier reconciliation failed");
            None
        }
    }
}

/// Repair pass: re-derives every user's tier in one statement. Returns how
/// many rows changed.
pub async fn reconcile_all(db: &PgPool) -> AppResult<u64> {
    let result = sqlx::query(
        r#"UPDATE users SET tier = derived.tier, updated_at = NOW()
        FROM (
            SELECT id,
                CASE
                    WHEN eco_coins > $1 THEN 'PLATINUM'::user_tier
                    WHEN eco_coins > $2 THEN 'GOLD'::user_tier
                    WHEN eco_coins > $3 THEN 'SILVER'::user_tier
                    ELSE 'BASE'::user_tier
                END AS tier
            FROM users
        ) AS derived
        WHERE users.id = derived.id AND users.tier <> derived.tier"#,
    )
    .bind(Tier::PLATINUM_ABOVE)
    .bind(Tier::GOLD_ABOVE)
    .bind(Tier::SILVER_ABOVE)
    .execute(db)
    .await?;

    let changed = result.rows_affected();
    tracing::info!(changed, "Tier repair pass finished");
    Ok(changed)
}
