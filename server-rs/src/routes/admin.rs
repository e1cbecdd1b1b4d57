use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::services::stats::{self, PlatformStats};
use crate::services::{leaderboard, tiers};
use crate::AppState;

pub async fn platform_stats(State(state): State<AppState>) -> AppResult<Json<PlatformStats>> {
    Ok(Json(stats::platform(&state.db).await?))
}

pub async fn reconcile_tiers(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let changed = tiers::reconcile_all(&state.db).await?;
    if changed > 0 {
        leaderboard::invalidate(&state.cache).await;
    }
    Ok(Json(json!({ "success": true, "changed": changed })))
}
