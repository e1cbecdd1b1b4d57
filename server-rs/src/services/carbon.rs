use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::carbon::{CarbonCalculateRequest, CarbonCredit};

/// Tonnes of CO2 a mango tree sequesters per year.
pub const MANGO_RATE: f64 = 0.022;
/// Tonnes of CO2 any other tree sequesters per year.
pub const DEFAULT_RATE: f64 = 0.02;
pub const PROJECTION_YEARS: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sequestration {
    pub annual: f64,
    pub total: f64,
}

pub fn estimate(tree_species: &str, tree_count: i32) -> Sequestration {
    let rate = if tree_species.to_lowercase().contains("mango") {
        MANGO_RATE
    } else {
        DEFAULT_RATE
    };
    let annual = f64::from(tree_count) * rate;
    Sequestration {
        annual,
        total: annual * PROJECTION_YEARS,
    }
}

pub async fn record(
    db: &PgPool,
    user_id: Uuid,
    request: &CarbonCalculateRequest,
) -> AppResult<CarbonCredit> {
    let project_name = request.project_name.trim();
    let tree_species = request.tree_species.trim();
    if project_name.is_empty() || tree_species.is_empty() {
        return Err(AppError::BadRequest(
            "projectName and treeSpecies are required".into(),
        ));
    }
    if request.tree_count < 1 {
        return Err(AppError::BadRequest("treeCount must be at least 1".into()));
    }

    let seq = estimate(tree_species, request.tree_count);
    let credit = sqlx::query_as::<_, CarbonCredit>(
        r#"INSERT INTO carbon_credits (user_id, project_name, tree_species, tree_count, annual_seq, total_seq, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', NOW())
        RETURNING *"#,
    )
    .bind(user_id)
    .bind(project_name)
    .bind(tree_species)
    .bind(request.tree_count)
    .bind(seq.annual)
    .bind(seq.total)
    .fetch_one(db)
    .await?;

    tracing::info!(credit_id = %credit.id, %user_id, annual = seq.annual, "Carbon credit recorded");
    Ok(credit)
}

pub async fn list_mine(db: &PgPool, user_id: Uuid) -> AppResult<Vec<CarbonCredit>> {
    let credits = sqlx::query_as::<_, CarbonCredit>(
        "SELECT * FROM carbon_credits WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(credits)
}
