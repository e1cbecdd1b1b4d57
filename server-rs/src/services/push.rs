//! Push delivery through the FCM HTTP v1 API.

use std::time::{Duration, Instant};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::FcmConfig;
use crate::error::{AppError, AppResult};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const GRANT_TYPE: &str = "urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Refresh a minute early so a token never expires mid-broadcast.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    pub success_count: u32,
    pub failure_count: u32,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct PushClient {
    http_client: reqwest::Client,
    project_id: String,
    client_email: String,
    signing_key: EncodingKey,
    access_token: Mutex<Option<AccessToken>>,
}

impl PushClient {
    /// `None` when FCM service-account credentials are not configured.
    pub fn from_config(config: &FcmConfig) -> AppResult<Option<Self>> {
        if config.project_id.is_empty()
            || config.client_email.is_empty()
            || config.private_key.is_empty()
        {
            return Ok(None);
        }
        let signing_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())?;
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("push HTTP client: {e}")))?;

        Ok(Some(Self {
            http_client,
            project_id: config.project_id.clone(),
            client_email: config.client_email.clone(),
            signing_key,
            access_token: Mutex::new(None),
        }))
    }

    /// Sends one notification per device token. Individual delivery failures
    /// are counted, not raised.
    pub async fn send_to_tokens(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
    ) -> AppResult<PushReport> {
        let access_token = self.access_token().await?;
        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        );

        let mut report = PushReport::default();
        for token in tokens {
            let result = self
                .http_client
                .post(&url)
                .bearer_auth(&access_token)
                .json(&json!({
                    "message": {
                        "token": token,
                        "notification": { "title": title, "body": body },
                    }
                }))
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => report.success_count += 1,
                Ok(resp) => {
                    tracing::debug!(status = %resp.status(), "Push delivery rejected");
                    report.failure_count += 1;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Push delivery failed");
                    report.failure_count += 1;
                }
            }
        }

        tracing::info!(
            success = report.success_count,
            failure = report.failure_count,
            "Push batch sent"
        );
        Ok(report)
    }

    async fn access_token(&self) -> AppResult<String> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let now = chrono::Utc::now().timestamp();
        let assertion = encode(
            &Header::new(Algorithm::RS256),
            &AssertionClaims {
                iss: &self.client_email,
                scope: FCM_SCOPE,
                aud: TOKEN_URL,
                iat: now,
                exp: now + ASSERTION_LIFETIME_SECS,
            },
            &self.signing_key,
        )?;

        let response = self
            .http_client
            .post(TOKEN_URL)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(format!("grant_type={GRANT_TYPE}&assertion={assertion}"))
            .send()
            .await
            .map_err(|e| unavailable(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(unavailable(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid token response: {e}")))?;

        let value = token.access_token.clone();
        *cached = Some(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }
}

fn unavailable(detail: String) -> AppError {
    tracing::error!(%detail, "Push service error");
    AppError::ServiceUnavailable("Push service unavailable".into())
}
