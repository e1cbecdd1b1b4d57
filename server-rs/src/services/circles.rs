use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{conflict_on_duplicate, AppError, AppResult};
use crate::models::community::{CircleMembership, EcoCircle};

pub async fn list(db: &PgPool) -> AppResult<Vec<EcoCircle>> {
    let circles = sqlx::query_as::<_, EcoCircle>(
        r#"SELECT c.id, c.name, c.description, c.location, c.image_url, c.created_at,
            COUNT(uc.user_id) AS member_count
        FROM eco_circles c
        LEFT JOIN user_eco_circles uc ON uc.circle_id = c.id
        GROUP BY c.id
        ORDER BY c.created_at DESC"#,
    )
    .fetch_all(db)
    .await?;
    Ok(circles)
}

pub async fn join(db: &PgPool, user_id: Uuid, circle_id: Uuid) -> AppResult<CircleMembership> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM eco_circles WHERE id = $1)")
            .bind(circle_id)
            .fetch_one(db)
            .await?;
    if !exists {
        return Err(AppError::NotFound("Circle not found".into()));
    }

    let membership = sqlx::query_as::<_, CircleMembership>(
        r#"INSERT INTO user_eco_circles (user_id, circle_id, role, joined_at)
        VALUES ($1, $2, 'MEMBER', NOW())
        RETURNING *"#,
    )
    .bind(user_id)
    .bind(circle_id)
    .fetch_one(db)
    .await
    .map_err(|e| conflict_on_duplicate(e, "Already joined"))?;

    tracing::info!(%user_id, %circle_id, "Circle joined");
    Ok(membership)
}
