use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthSession;
use crate::models::activity::Activity;
use crate::models::user::{FcmTokenRequest, LeaderboardEntry, User};
use crate::models::ledger::LedgerEntry;
use crate::routes::extract::{AppJson, AppQuery, PaginationQuery};
use crate::services::stats::UserStats;
use crate::services::{leaderboard, stats, users};
use crate::AppState;

#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub activities: Vec<Activity>,
}

pub async fn sync(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
) -> AppResult<Json<User>> {
    let user = users::sync(&state.db, &session.identity).await?;
    Ok(Json(user))
}

pub async fn profile(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
) -> AppResult<Json<ProfileResponse>> {
    let user = session
        .user
        .clone()
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let activities = sqlx::query_as::<_, Activity>(
        "SELECT * FROM activities WHERE user_id = $1 ORDER BY created_at DESC LIMIT 5",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ProfileResponse { user, activities }))
}

pub async fn user_stats(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
) -> AppResult<Json<UserStats>> {
    let user = session.synced()?;
    Ok(Json(stats::for_user(&state.db, user).await?))
}

pub async fn transactions(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    AppQuery(q): AppQuery<PaginationQuery>,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    let user = session.synced()?;
    let (limit, offset) = q.bounds();
    Ok(Json(
        stats::transactions(&state.db, user.id, limit, offset).await?,
    ))
}

pub async fn register_fcm_token(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    AppJson(body): AppJson<FcmTokenRequest>,
) -> AppResult<Json<Value>> {
    let user = session.synced()?;
    users::set_fcm_token(&state.db, user.id, &body.fcm_token).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    let cfg = &state.config.leaderboard;
    Ok(Json(
        leaderboard::top(&state.db, &state.cache, cfg.size, cfg.cache_seconds).await?,
    ))
}
