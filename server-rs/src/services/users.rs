use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::user::User;
use crate::services::identity::Identity;

pub const DEFAULT_DISPLAY_NAME: &str = "Eco Warrior";

/// Profile values for a first-time sync, with fallbacks for missing claims.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
}

impl NewProfile {
    pub fn from_identity(identity: &Identity) -> Self {
        let claims = &identity.claims;
        Self {
            email: non_blank(&claims.email)
                .unwrap_or_else(|| format!("user_{}@example.com", identity.subject)),
            display_name: non_blank(&claims.name)
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            photo_url: non_blank(&claims.picture),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

pub async fn find_by_uid(db: &PgPool, firebase_uid: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE firebase_uid = $1")
        .bind(firebase_uid)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

/// Idempotent upsert keyed by the external subject.
///
/// Creation takes the fallback profile; a repeat sync only refreshes the
/// profile fields whose claims are present. Balance, streak, tier and role
/// are never written here.
pub async fn sync(db: &PgPool, identity: &Identity) -> AppResult<User> {
    let profile = NewProfile::from_identity(identity);

    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (firebase_uid, email, display_name, photo_url)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (firebase_uid) DO UPDATE SET
            email = COALESCE($5, users.email),
            display_name = COALESCE($6, users.display_name),
            photo_url = COALESCE($4, users.photo_url),
            updated_at = NOW()
        RETURNING *"#,
    )
    .bind(&identity.subject)
    .bind(&profile.email)
    .bind(&profile.display_name)
    .bind(&profile.photo_url)
    .bind(non_blank(&identity.claims.email))
    .bind(non_blank(&identity.claims.name))
    .fetch_one(db)
    .await?;

    tracing::info!(user_id = %user.id, firebase_uid = %identity.subject, "User synced");
    Ok(user)
}

pub async fn set_fcm_token(db: &PgPool, user_id: Uuid, token: &str) -> AppResult<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("fcmToken is required".into()));
    }
    sqlx::query("UPDATE users SET fcm_token = $1, updated_at = NOW() WHERE id = $2")
        .bind(token)
        .bind(user_id)
        .execute(db)
        .await?;
    tracing::debug!(%user_id, "Push token registered");
    Ok(())
}
