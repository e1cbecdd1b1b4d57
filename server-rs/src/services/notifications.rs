use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::notification::{NotificationRequest, NotificationTarget};
use crate::services::push::{PushClient, PushReport};

/// Device tokens addressed by a notification request.
pub async fn target_tokens(db: &PgPool, request: &NotificationRequest) -> AppResult<Vec<String>> {
    let tokens = match (request.target, request.user_id) {
        (NotificationTarget::All, _) => {
            sqlx::query_scalar::<_, String>(
                "SELECT fcm_token FROM users WHERE fcm_token IS NOT NULL AND fcm_token <> ''",
            )
            .fetch_all(db)
            .await?
        }
        (NotificationTarget::User, Some(user_id)) => {
            sqlx::query_scalar::<_, String>(
                "SELECT fcm_token FROM users WHERE id = $1 AND fcm_token IS NOT NULL AND fcm_token <> ''",
            )
            .bind(user_id)
            .fetch_all(db)
            .await?
        }
        (NotificationTarget::User, None) => {
            return Err(AppError::BadRequest("userId is required for USER target".into()));
        }
    };
    Ok(tokens)
}

pub async fn send(
    db: &PgPool,
    push: &PushClient,
    request: &NotificationRequest,
) -> AppResult<PushReport> {
    if request.title.trim().is_empty() || request.body.trim().is_empty() {
        return Err(AppError::BadRequest("title and body are required".into()));
    }

    let tokens = target_tokens(db, request).await?;
    if tokens.is_empty() {
        return Err(AppError::NotFound("No target users found with tokens".into()));
    }

    push.send_to_tokens(&tokens, &request.title, &request.body)
        .await
}
