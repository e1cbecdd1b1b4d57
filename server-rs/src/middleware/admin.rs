use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::AppError;
use crate::middleware::auth::{authorize, AuthSession};
use crate::models::user::Role;

/// Middleware: requires an authenticated ADMIN. Must run after `authenticate`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let session = authorize(req.extensions().get::<AuthSession>(), Role::Admin)?;
    if let Some(user) = &session.user {
        tracing::debug!(admin_id = %user.id, path = %req.uri().path(), "Admin access granted");
    }
    Ok(next.run(req).await)
}
