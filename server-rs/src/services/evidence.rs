//! Activity evidence storage on Cloudinary.
//!
//! Uploads are signed requests carrying the image as a base64 data URI, so
//! nothing touches the local filesystem.

use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::config::CloudinaryConfig;
use crate::error::{AppError, AppResult};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A stored evidence asset.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredEvidence {
    pub secure_url: String,
    pub public_id: String,
}

/// An in-memory upload awaiting storage.
#[derive(Debug, Clone)]
pub struct EvidenceUpload {
    pub bytes: bytes::Bytes,
    pub content_type: String,
}

impl EvidenceUpload {
    fn data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.content_type, encoded)
    }
}

pub struct EvidenceStore {
    http_client: reqwest::Client,
    config: CloudinaryConfig,
}

impl EvidenceStore {
    /// `None` when Cloudinary credentials are not configured.
    pub fn from_config(config: &CloudinaryConfig) -> AppResult<Option<Self>> {
        if config.cloud_name.is_empty() || config.api_key.is_empty() || config.api_secret.is_empty()
        {
            return Ok(None);
        }
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("evidence HTTP client: {e}")))?;
        Ok(Some(Self {
            http_client,
            config: config.clone(),
        }))
    }

    pub async fn store(&self, upload: &EvidenceUpload) -> AppResult<StoredEvidence> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", &self.config.folder), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let response = self
            .http_client
            .post(self.endpoint("upload"))
            .json(&json!({
                "file": upload.data_uri(),
                "folder": self.config.folder,
                "timestamp": timestamp,
                "api_key": self.config.api_key,
                "signature": signature,
                "signature_algorithm": "sha256",
            }))
            .send()
            .await
            .map_err(|e| unavailable(format!("upload request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("upload returned {status}: {body}")));
        }

        let stored: StoredEvidence = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid upload response: {e}")))?;
        tracing::info!(public_id = %stored.public_id, bytes = upload.bytes.len(), "Evidence uploaded");
        Ok(stored)
    }

    pub async fn destroy(&self, public_id: &str) -> AppResult<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let response = self
            .http_client
            .post(self.endpoint("destroy"))
            .json(&json!({
                "public_id": public_id,
                "timestamp": timestamp,
                "api_key": self.config.api_key,
                "signature": signature,
                "signature_algorithm": "sha256",
            }))
            .send()
            .await
            .map_err(|e| unavailable(format!("destroy request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("destroy returned {}", response.status())));
        }
        tracing::info!(%public_id, "Evidence destroyed");
        Ok(())
    }

    /// Deletes an orphaned upload, logging instead of failing.
    pub async fn destroy_best_effort(&self, public_id: &str) {
        if let Err(e) = self.destroy(public_id).await {
            tracing::warn!(%public_id, error = %e, "Failed to clean up orphaned evidence");
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{}/image/{action}", self.config.cloud_name)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, secret appended, SHA-256 hex.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn unavailable(detail: String) -> AppError {
    tracing::error!(%detail, "Evidence storage error");
    AppError::ServiceUnavailable("Image upload failed".into())
}
