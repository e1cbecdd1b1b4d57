use axum::{extract::State, Json};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::auth::AuthSession;
use crate::models::mission::{Mission, MyMission, ProgressRequest, UserMission};
use crate::routes::extract::{AppJson, AppPath};
use crate::services::{leaderboard, missions, tiers};
use crate::AppState;

pub async fn list_missions(State(state): State<AppState>) -> AppResult<Json<Vec<Mission>>> {
    Ok(Json(missions::list_active(&state.db).await?))
}

pub async fn my_missions(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
) -> AppResult<Json<Vec<MyMission>>> {
    let user = session.synced()?;
    Ok(Json(missions::list_mine(&state.db, user.id).await?))
}

pub async fn join_mission(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    AppPath(mission_id): AppPath<Uuid>,
) -> AppResult<Json<UserMission>> {
    let user = session.synced()?;
    Ok(Json(missions::join(&state.db, user.id, mission_id).await?))
}

pub async fn update_progress(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    AppPath(mission_id): AppPath<Uuid>,
    AppJson(body): AppJson<ProgressRequest>,
) -> AppResult<Json<UserMission>> {
    let user = session.synced()?;
    let outcome =
        missions::update_progress(&state.db, user.id, mission_id, body.progress, body.status)
            .await?;

    if outcome.credited.is_some() {
        tiers::reconcile_best_effort(&state.db, user.id).await;
        leaderboard::invalidate(&state.cache).await;
    }
    Ok(Json(outcome.membership))
}
