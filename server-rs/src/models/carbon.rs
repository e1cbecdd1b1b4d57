use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CarbonCredit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_name: String,
    pub tree_species: String,
    pub tree_count: i32,
    pub annual_seq: f64,
    pub total_seq: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonCalculateRequest {
    pub project_name: String,
    pub tree_species: String,
    pub tree_count: i32,
}
