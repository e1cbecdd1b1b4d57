use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::activity::{Activity, NewActivity, PendingActivity};

/// Appends a PENDING activity for `user_id`.
pub async fn submit(db: &PgPool, user_id: Uuid, new: &NewActivity) -> AppResult<Activity> {
    let activity = sqlx::query_as::<_, Activity>(
        r#"INSERT INTO activities (user_id, activity_type, title, description, image_url, co2_saved, water_saved, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'PENDING', NOW())
        RETURNING *"#,
    )
    .bind(user_id)
    .bind(&new.activity_type)
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.image_url)
    .bind(new.co2_saved)
    .bind(new.water_saved)
    .fetch_one(db)
    .await?;

    tracing::info!(activity_id = %activity.id, %user_id, kind = %activity.activity_type, "Activity submitted");
    Ok(activity)
}

/// The user's activities, newest first.
pub async fn list_mine(db: &PgPool, user_id: Uuid) -> AppResult<Vec<Activity>> {
    let rows = sqlx::query_as::<_, Activity>(
        "SELECT * FROM activities WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// The review queue, oldest claim first.
pub async fn list_pending(db: &PgPool, limit: i64, offset: i64) -> AppResult<Vec<PendingActivity>> {
    let rows = sqlx::query_as::<_, PendingActivity>(
        r#"SELECT a.*, u.display_name AS submitter_name
        FROM activities a
        JOIN users u ON u.id = a.user_id
        WHERE a.status = 'PENDING'
        ORDER BY a.created_at ASC, a.id ASC
        LIMIT $1 OFFSET $2"#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
