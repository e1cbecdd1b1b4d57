use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, AppResult};
use crate::models::user::{Role, User};
use crate::services::identity::Identity;
use crate::services::users;
use crate::AppState;

/// The caller behind a request: a verified identity and, once synced, the
/// local user record it maps to.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    pub user: Option<User>,
}

impl AuthSession {
    /// The local user, for handlers that touch user-owned data.
    pub fn synced(&self) -> AppResult<&User> {
        self.user.as_ref().ok_or(AppError::UserNotSynced)
    }
}

/// Access policy. Pure: no I/O, decides from the session alone.
pub fn authorize(session: Option<&AuthSession>, required: Role) -> AppResult<&AuthSession> {
    let session =
        session.ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
    match required {
        Role::Member => Ok(session),
        Role::Admin => match &session.user {
            Some(user) if user.is_admin() => Ok(session),
            _ => Err(AppError::Forbidden("Admin access required".into())),
        },
    }
}

/// Middleware: requires a valid bearer token. Sets AuthSession in extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::Unauthorized("No token provided".into()))?;

    let identity = state.identity.resolve(bearer.token()).await?;
    let user = users::find_by_uid(&state.db, &identity.subject).await?;

    tracing::debug!(subject = %identity.subject, synced = user.is_some(), "Request authenticated");
    req.extensions_mut().insert(AuthSession { identity, user });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Tier;
    use crate::services::identity::IdentityClaims;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            firebase_uid: "uid-1".into(),
            email: "a@example.com".into(),
            display_name: "A".into(),
            photo_url: None,
            fcm_token: None,
            eco_coins: 0,
            streak: 0,
            tier: Tier::Base,
            last_activity_date: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn session(user: Option<User>) -> AuthSession {
        AuthSession {
            identity: Identity {
                subject: "uid-1".into(),
                claims: IdentityClaims::default(),
            },
            user,
        }
    }

    #[test]
    fn missing_session_is_unauthenticated() {
        assert!(matches!(
            authorize(None, Role::Member),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            authorize(None, Role::Admin),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn members_pass_member_checks_only() {
        let s = session(Some(user(Role::Member)));
        assert!(authorize(Some(&s), Role::Member).is_ok());
        assert!(matches!(
            authorize(Some(&s), Role::Admin),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admins_pass_both_checks() {
        let s = session(Some(user(Role::Admin)));
        assert!(authorize(Some(&s), Role::Member).is_ok());
        assert!(authorize(Some(&s), Role::Admin).is_ok());
    }

    #[test]
    fn unsynced_identity_is_not_an_admin() {
        let s = session(None);
        assert!(authorize(Some(&s), Role::Member).is_ok());
        assert!(matches!(
            authorize(Some(&s), Role::Admin),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(s.synced(), Err(AppError::UserNotSynced)));
    }
}
