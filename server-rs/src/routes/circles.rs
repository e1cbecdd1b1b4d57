use axum::{extract::State, Json};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::auth::AuthSession;
use crate::models::community::{CircleMembership, EcoCircle};
use crate::routes::extract::AppPath;
use crate::services::circles;
use crate::AppState;

pub async fn list_circles(State(state): State<AppState>) -> AppResult<Json<Vec<EcoCircle>>> {
    Ok(Json(circles::list(&state.db).await?))
}

pub async fn join_circle(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    AppPath(circle_id): AppPath<Uuid>,
) -> AppResult<Json<CircleMembership>> {
    let user = session.synced()?;
    Ok(Json(circles::join(&state.db, user.id, circle_id).await?))
}
