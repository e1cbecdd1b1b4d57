use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::auth::AuthSession;
use crate::models::carbon::{CarbonCalculateRequest, CarbonCredit};
use crate::routes::extract::AppJson;
use crate::services::carbon;
use crate::AppState;

pub async fn calculate(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    AppJson(body): AppJson<CarbonCalculateRequest>,
) -> AppResult<Json<CarbonCredit>> {
    let user = session.synced()?;
    Ok(Json(carbon::record(&state.db, user.id, &body).await?))
}

pub async fn my_credits(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
) -> AppResult<Json<Vec<CarbonCredit>>> {
    let user = session.synced()?;
    Ok(Json(carbon::list_mine(&state.db, user.id).await?))
}
