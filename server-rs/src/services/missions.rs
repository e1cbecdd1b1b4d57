use sqlx::PgPool;
use uuid::Uuid;

use crate::db::UnitOfWork;
use crate::error::{conflict_on_duplicate, AppError, AppResult};
use crate::models::ledger::LedgerKind;
use crate::models::mission::{Mission, MissionStatus, MyMission, UserMission};
use crate::services::ledger;

/// Result of a progress update: the membership and the coins it paid out,
/// if this call completed the mission.
#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    pub membership: UserMission,
    pub credited: Option<i64>,
}

pub async fn list_active(db: &PgPool) -> AppResult<Vec<Mission>> {
    let missions = sqlx::query_as::<_, Mission>(
        "SELECT * FROM missions WHERE is_active = TRUE ORDER BY created_at DESC",
    )
    .fetch_all(db)
    .await?;
    Ok(missions)
}

pub async fn list_mine(db: &PgPool, user_id: Uuid) -> AppResult<Vec<MyMission>> {
    let rows = sqlx::query_as::<_, MyMission>(
        r#"SELECT um.*, m.title, m.reward
        FROM user_missions um
        JOIN missions m ON m.id = um.mission_id
        WHERE um.user_id = $1
        ORDER BY um.joined_at DESC"#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn join(db: &PgPool, user_id: Uuid, mission_id: Uuid) -> AppResult<UserMission> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM missions WHERE id = $1 AND is_active = TRUE)",
    )
    .bind(mission_id)
    .fetch_one(db)
    .await?;
    if !exists {
        return Err(AppError::NotFound("Mission not found".into()));
    }

    let membership = sqlx::query_as::<_, UserMission>(
        r#"INSERT INTO user_missions (user_id, mission_id, status, progress, joined_at)
        VALUES ($1, $2, 'ACTIVE', 0, NOW())
        RETURNING *"#,
    )
    .bind(user_id)
    .bind(mission_id)
    .fetch_one(db)
    .await
    .map_err(|e| conflict_on_duplicate(e, "Already joined"))?;

    tracing::info!(%user_id, %mission_id, "Mission joined");
    Ok(membership)
}

/// Records progress and, on the first move into COMPLETED, credits the
/// mission reward in the same transaction. A completed membership is final.
pub async fn update_progress(
    db: &PgPool,
    user_id: Uuid,
    mission_id: Uuid,
    progress: Option<i32>,
    status: Option<MissionStatus>,
) -> AppResult<ProgressOutcome> {
    if let Some(p) = progress {
        if !(0..=100).contains(&p) {
            return Err(AppError::BadRequest("progress must be between 0 and 100".into()));
        }
    }

    let mut uow = UnitOfWork::begin(db).await?;

    let current = sqlx::query_as::<_, UserMission>(
        "SELECT * FROM user_missions WHERE user_id = $1 AND mission_id = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(mission_id)
    .fetch_optional(uow.conn())
    .await?
    .ok_or_else(|| AppError::NotFound("Mission membership not found".into()))?;

    if current.status == MissionStatus::Completed {
        uow.rollback().await?;
        return Ok(ProgressOutcome {
            membership: current,
            credited: None,
        });
    }

    // Reaching 100% completes the mission just like an explicit COMPLETED.
    let completing = status == Some(MissionStatus::Completed) || progress == Some(100);
    let progress = match (progress, completing) {
        (_, true) => 100,
        (Some(p), false) => p,
        (None, false) => current.progress,
    };
    let next_status = if completing {
        MissionStatus::Completed
    } else {
        MissionStatus::Active
    };

    let membership = sqlx::query_as::<_, UserMission>(
        r#"UPDATE user_missions
        SET progress = $1,
            status = $2,
            completed_at = CASE WHEN $2 = 'COMPLETED'::mission_status THEN NOW() ELSE completed_at END
        WHERE user_id = $3 AND mission_id = $4
        RETURNING *"#,
    )
    .bind(progress)
    .bind(next_status)
    .bind(user_id)
    .bind(mission_id)
    .fetch_one(uow.conn())
    .await?;

    let credited = if completing {
        let reward: i64 = sqlx::query_scalar("SELECT reward FROM missions WHERE id = $1")
            .bind(mission_id)
            .fetch_one(uow.conn())
            .await?;
        ledger::credit(&mut uow, user_id, reward, LedgerKind::MissionReward, mission_id).await?;
        Some(reward)
    } else {
        None
    };

    uow.commit().await?;

    if let Some(reward) = credited {
        tracing::info!(%user_id, %mission_id, reward, "Mission completed");
    }
    Ok(ProgressOutcome {
        membership,
        credited,
    })
}
