//! Activity verification: the PENDING → VERIFIED/REJECTED state machine and
//! the reward it pays out.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::Cache;
use crate::db::UnitOfWork;
use crate::error::{AppError, AppResult};
use crate::models::activity::{Activity, ActivityStatus, Decision};
use crate::models::ledger::LedgerKind;
use crate::services::leaderboard;
use crate::services::ledger;
use crate::services::push::PushClient;
use crate::services::rewards::RewardPolicy;
use crate::services::tiers;

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub activity: Activity,
    /// Balance and streak after an approval; `None` for a rejection.
    pub payout: Option<Payout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub reward: i64,
    pub eco_coins: i64,
    pub streak: i32,
}

pub async fn verify(
    db: &PgPool,
    policy: &RewardPolicy,
    activity_id: Uuid,
    decision: Decision,
    admin_id: Uuid,
) -> AppResult<VerificationOutcome> {
    let mut uow = UnitOfWork::begin(db).await?;

    let current = sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE id = $1 FOR UPDATE")
        .bind(activity_id)
        .fetch_optional(uow.conn())
        .await?
        .ok_or_else(|| AppError::NotFound("Activity not found".into()))?;

    let next = current.status.apply(decision)?;
    let now = Utc::now();

    let outcome = match next {
        ActivityStatus::Verified => {
            let (streak, last_activity): (i32, Option<chrono::DateTime<Utc>>) = sqlx::query_as(
                "SELECT streak, last_activity_date FROM users WHERE id = $1 FOR UPDATE",
            )
            .bind(current.user_id)
            .fetch_optional(uow.conn())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

            let reward = policy.reward_for(current.co2_saved);
            let new_streak = policy.next_streak(streak, last_activity, now);

            let activity = sqlx::query_as::<_, Activity>(
                r#"UPDATE activities
                SET status = 'VERIFIED', verified_at = $1, verified_by = $2, reward = $3
                WHERE id = $4
                RETURNING *"#,
            )
            .bind(now)
            .bind(admin_id)
            .bind(reward)
            .bind(activity_id)
            .fetch_one(uow.conn())
            .await?;

            let eco_coins = ledger::credit(
                &mut uow,
                current.user_id,
                reward,
                LedgerKind::Reward,
                activity_id,
            )
            .await?;

            sqlx::query(
                "UPDATE users SET streak = $1, last_activity_date = $2, updated_at = NOW() WHERE id = $3",
            )
            .bind(new_streak)
            .bind(now)
            .bind(current.user_id)
            .execute(uow.conn())
            .await?;

            VerificationOutcome {
                activity,
                payout: Some(Payout {
                    reward,
                    eco_coins,
                    streak: new_streak,
                }),
            }
        }
        ActivityStatus::Rejected => {
            let activity = sqlx::query_as::<_, Activity>(
                r#"UPDATE activities
                SET status = 'REJECTED', verified_at = $1, verified_by = $2
                WHERE id = $3
                RETURNING *"#,
            )
            .bind(now)
            .bind(admin_id)
            .bind(activity_id)
            .fetch_one(uow.conn())
            .await?;

            VerificationOutcome {
                activity,
                payout: None,
            }
        }
        ActivityStatus::Pending => {
            return Err(AppError::Internal(format!(
                "decision on activity {activity_id} resolved to PENDING"
            )));
        }
    };

    uow.commit().await?;

    tracing::info!(
        %activity_id,
        %admin_id,
        user_id = %outcome.activity.user_id,
        status = ?outcome.activity.status,
        reward = outcome.payout.map(|p| p.reward),
        "Activity verified"
    );
    Ok(outcome)
}

/// Follow-up work once a verification has committed. Nothing here can undo
/// the payout; every failure is logged and swallowed.
pub async fn after_commit(
    db: &PgPool,
    cache: &Cache,
    push: Option<&PushClient>,
    outcome: &VerificationOutcome,
) {
    let Some(payout) = outcome.payout else {
        return;
    };
    let user_id = outcome.activity.user_id;

    tiers::reconcile_best_effort(db, user_id).await;
    leaderboard::invalidate(cache).await;

    let Some(push) = push else {
        return;
    };
    let token: Option<String> =
        match sqlx::query_scalar::<_, Option<String>>("SELECT fcm_token FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await
        {
            Ok(token) => token.flatten(),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Could not load push token");
                None
            }
        };
    let Some(token) = token else {
        return;
    };

    let body = format!(
        "\"{}\" was verified. You earned {} EcoCoins!",
        outcome.activity.title, payout.reward
    );
    if let Err(e) = push
        .send_to_tokens(&[token], "Activity verified", &body)
        .await
    {
        tracing::warn!(%user_id, error = %e, "Verification push failed");
    }
}
