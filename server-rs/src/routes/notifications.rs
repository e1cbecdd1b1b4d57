use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::notification::NotificationRequest;
use crate::routes::extract::AppJson;
use crate::services::notifications;
use crate::AppState;

pub async fn send(
    State(state): State<AppState>,
    AppJson(body): AppJson<NotificationRequest>,
) -> AppResult<Json<Value>> {
    let push = state
        .push
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Push notifications are not configured".into()))?;

    let report = notifications::send(&state.db, push, &body).await?;
    Ok(Json(json!({
        "success": true,
        "successCount": report.success_count,
        "failureCount": report.failure_count,
    })))
}
