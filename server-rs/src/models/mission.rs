use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "mission_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MissionStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub mission_type: String,
    pub duration: i32,
    pub reward: i64,
    pub co2_target: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserMission {
    pub user_id: Uuid,
    pub mission_id: Uuid,
    pub status: MissionStatus,
    pub progress: i32,
    pub joined_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MyMission {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub membership: UserMission,
    pub title: String,
    pub reward: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub progress: Option<i32>,
    pub status: Option<MissionStatus>,
}
