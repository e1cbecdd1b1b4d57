use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::ledger::LedgerEntry;
use crate::models::user::{Tier, User};

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCounts {
    pub total: i64,
    pub pending: i64,
    pub verified: i64,
    pub rejected: i64,
    pub co2_saved: f64,
    pub water_saved: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub eco_coins: i64,
    pub streak: i32,
    pub tier: Tier,
    pub activities: ActivityCounts,
    pub completed_missions: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_activities: i64,
    pub pending_activities: i64,
    #[serde(rename = "totalCO2Saved")]
    pub total_co2_saved: f64,
    pub total_water_saved: f64,
}

/// Savings only count once an activity is VERIFIED.
pub async fn for_user(db: &PgPool, user: &User) -> AppResult<UserStats> {
    let activities = sqlx::query_as::<_, ActivityCounts>(
        r#"SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
            COUNT(*) FILTER (WHERE status = 'VERIFIED') AS verified,
            COUNT(*) FILTER (WHERE status = 'REJECTED') AS rejected,
            COALESCE(SUM(co2_saved) FILTER (WHERE status = 'VERIFIED'), 0)::DOUBLE PRECISION AS co2_saved,
            COALESCE(SUM(water_saved) FILTER (WHERE status = 'VERIFIED'), 0)::DOUBLE PRECISION AS water_saved
        FROM activities
        WHERE user_id = $1"#,
    )
    .bind(user.id)
    .fetch_one(db)
    .await?;

    let completed_missions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_missions WHERE user_id = $1 AND status = 'COMPLETED'",
    )
    .bind(user.id)
    .fetch_one(db)
    .await?;

    Ok(UserStats {
        eco_coins: user.eco_coins,
        streak: user.streak,
        tier: user.tier,
        activities,
        completed_missions,
    })
}

pub async fn platform(db: &PgPool) -> AppResult<PlatformStats> {
    let stats = sqlx::query_as::<_, PlatformStats>(
        r#"SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM activities) AS total_activities,
            (SELECT COUNT(*) FROM activities WHERE status = 'PENDING') AS pending_activities,
            (SELECT COALESCE(SUM(co2_saved), 0)::DOUBLE PRECISION FROM activities) AS total_co2_saved,
            (SELECT COALESCE(SUM(water_saved), 0)::DOUBLE PRECISION FROM activities) AS total_water_saved"#,
    )
    .fetch_one(db)
    .await?;
    Ok(stats)
}

/// The user's balance history, newest first.
pub async fn transactions(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<LedgerEntry>> {
    let entries = sqlx::query_as::<_, LedgerEntry>(
        r#"SELECT * FROM ledger_entries
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3"#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(entries)
}
