use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityStatus {
    Pending,
    Verified,
    Rejected,
}

/// An admin's ruling on a pending activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    #[serde(alias = "VERIFIED")]
    Approved,
    Rejected,
}

impl ActivityStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ActivityStatus::Pending)
    }

    /// PENDING is the only state that accepts a decision.
    pub fn apply(self, decision: Decision) -> AppResult<ActivityStatus> {
        if self.is_terminal() {
            return Err(AppError::AlreadyProcessed(
                "Activity already processed".into(),
            ));
        }
        Ok(match decision {
            Decision::Approved => ActivityStatus::Verified,
            Decision::Rejected => ActivityStatus::Rejected,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    pub co2_saved: Option<f64>,
    pub water_saved: Option<f64>,
    pub status: ActivityStatus,
    pub reward: Option<i64>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Review-queue row: the activity plus who submitted it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PendingActivity {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub activity: Activity,
    pub submitter_name: String,
}

/// Raw submission fields as they arrive in JSON, urlencoded or multipart bodies.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityForm {
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "co2Saved", default, deserialize_with = "lenient_f64")]
    pub co2_saved: Option<f64>,
    #[serde(rename = "waterSaved", default, deserialize_with = "lenient_f64")]
    pub water_saved: Option<f64>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
}

/// A validated submission, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub activity_type: String,
    pub title: String,
    pub description: Option<String>,
    pub co2_saved: Option<f64>,
    pub water_saved: Option<f64>,
    pub image_url: Option<String>,
}

impl NewActivity {
    pub fn from_form(form: ActivityForm) -> AppResult<Self> {
        let activity_type = required(form.activity_type, "type")?;
        let title = required(form.title, "title")?;
        Ok(Self {
            activity_type,
            title,
            description: non_blank(form.description),
            co2_saved: measurement(form.co2_saved, "co2Saved")?,
            water_saved: measurement(form.water_saved, "waterSaved")?,
            image_url: non_blank(form.image_url),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub status: Decision,
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    non_blank(value).ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Largest saving a single activity may claim, in kg or litres.
pub const MAX_MEASUREMENT: f64 = 1_000_000.0;

// None stays None: "unmeasured" and "measured at zero" are different facts.
fn measurement(value: Option<f64>, field: &str) -> AppResult<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::BadRequest(format!(
            "{field} must be a non-negative number"
        ))),
        Some(v) if v > MAX_MEASUREMENT => Err(AppError::BadRequest(format!(
            "{field} must not exceed {MAX_MEASUREMENT}"
        ))),
        other => Ok(other),
    }
}

/// Accepts `1.5`, `"1.5"`, `""` and `null`; blank strings count as absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number: {s}"))),
    }
}
