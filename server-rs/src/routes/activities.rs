use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    Form, Json,
};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthSession;
use crate::models::activity::{Activity, ActivityForm, NewActivity, PendingActivity, VerifyRequest};
use crate::routes::extract::{AppJson, AppPath, AppQuery, PaginationQuery};
use crate::services::evidence::EvidenceUpload;
use crate::services::{activities, verification};
use crate::AppState;

/// An activity submission in any of the accepted encodings: JSON,
/// urlencoded form, or multipart form with an optional `image` part.
pub struct ActivitySubmission {
    pub form: ActivityForm,
    pub image: Option<EvidenceUpload>,
}

#[async_trait]
impl<S> FromRequest<S> for ActivitySubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return read_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state).await?;
            return Ok(Self {
                form: form_from_fields(fields)?,
                image: None,
            });
        }

        let Json(form) = Json::<ActivityForm>::from_request(req, state).await?;
        Ok(Self { form, image: None })
    }
}

async fn read_multipart(mut multipart: Multipart) -> AppResult<ActivitySubmission> {
    let mut fields = HashMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            if !content_type.starts_with("image/") {
                return Err(AppError::BadRequest("image must be an image file".into()));
            }
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !bytes.is_empty() {
                image = Some(EvidenceUpload {
                    bytes,
                    content_type,
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            fields.insert(name, value);
        }
    }

    Ok(ActivitySubmission {
        form: form_from_fields(fields)?,
        image,
    })
}

fn form_from_fields(fields: HashMap<String, String>) -> AppResult<ActivityForm> {
    let object = fields
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect::<serde_json::Map<_, _>>();
    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

pub async fn submit(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    submission: ActivitySubmission,
) -> AppResult<(StatusCode, Json<Activity>)> {
    let user = session.synced()?;
    let mut new = NewActivity::from_form(submission.form)?;

    // Upload first: a failed upload must leave no activity behind.
    let stored = match &submission.image {
        Some(upload) => {
            let store = state.evidence.as_ref().ok_or_else(|| {
                AppError::ServiceUnavailable("Image uploads are not configured".into())
            })?;
            let stored = store.store(upload).await?;
            new.image_url = Some(stored.secure_url.clone());
            Some(stored)
        }
        None => None,
    };

    match activities::submit(&state.db, user.id, &new).await {
        Ok(activity) => Ok((StatusCode::CREATED, Json(activity))),
        Err(e) => {
            if let (Some(stored), Some(store)) = (&stored, state.evidence.as_ref()) {
                store.destroy_best_effort(&stored.public_id).await;
            }
            Err(e)
        }
    }
}

pub async fn list_mine(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
) -> AppResult<Json<Vec<Activity>>> {
    let user = session.synced()?;
    Ok(Json(activities::list_mine(&state.db, user.id).await?))
}

pub async fn list_pending(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<PaginationQuery>,
) -> AppResult<Json<Vec<PendingActivity>>> {
    let (limit, offset) = q.bounds();
    Ok(Json(
        activities::list_pending(&state.db, limit, offset).await?,
    ))
}

pub async fn verify(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    AppPath(activity_id): AppPath<uuid::Uuid>,
    AppJson(body): AppJson<VerifyRequest>,
) -> AppResult<Json<Activity>> {
    let admin = session.synced()?;
    let outcome = verification::verify(
        &state.db,
        &state.rewards,
        activity_id,
        body.status,
        admin.id,
    )
    .await?;

    verification::after_commit(&state.db, &state.cache, state.push.as_deref(), &outcome).await;
    Ok(Json(outcome.activity))
}
