//! Firebase ID token verification.
//!
//! Production tokens are RS256, signed by keys published at the secure-token
//! JWKS endpoint. Keys are cached for the endpoint's `max-age`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Profile claims the identity authority may or may not include.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// An externally authenticated principal. Says nothing about whether a
/// local user record exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub subject: String,
    pub claims: IdentityClaims,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FirebaseClaims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub exp: u64,
    pub iat: Option<u64>,
    #[serde(flatten)]
    pub profile: IdentityClaims,
}

enum VerifierMode {
    Firebase,
    SharedSecret(Arc<DecodingKey>),
}

struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

pub struct IdentityResolver {
    http_client: reqwest::Client,
    project_id: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl IdentityResolver {
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("identity HTTP client: {e}")))?;

        let mode = match &config.dev_secret {
            Some(secret) => {
                tracing::warn!("Identity resolver using shared-secret tokens (dev mode)");
                VerifierMode::SharedSecret(Arc::new(DecodingKey::from_secret(secret.as_bytes())))
            }
            None => VerifierMode::Firebase,
        };

        tracing::info!(project_id = %config.firebase_project_id, "Identity resolver initialized");

        Ok(Self {
            http_client,
            project_id: config.firebase_project_id.clone(),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn issuer(&self) -> String {
        format!("{ISSUER_PREFIX}{}", self.project_id)
    }

    /// Validates a bearer token and returns the identity it asserts.
    pub async fn resolve(&self, token: &str) -> AppResult<Identity> {
        if token.trim().is_empty() {
            return Err(AppError::Unauthorized("Empty bearer token".into()));
        }

        let (key, algorithm) = match &self.mode {
            VerifierMode::SharedSecret(key) => (key.clone(), Algorithm::HS256),
            VerifierMode::Firebase => {
                let header = decode_header(token)
                    .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;
                if header.alg != Algorithm::RS256 {
                    return Err(AppError::Unauthorized("Invalid token".into()));
                }
                let kid = header
                    .kid
                    .ok_or_else(|| AppError::Unauthorized("Invalid token".into()))?;
                (self.decoding_key_for_kid(&kid).await?, Algorithm::RS256)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<FirebaseClaims>(token, key.as_ref(), &validation)?.claims;

        if claims.sub.is_empty() {
            return Err(AppError::Unauthorized("Invalid token subject".into()));
        }

        Ok(Identity {
            subject: claims.sub,
            claims: claims.profile,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> AppResult<Arc<DecodingKey>> {
        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        // Keys rotate; an unknown kid earns one forced refresh before rejection.
        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(AppError::Unauthorized("Invalid token".into()))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > Instant::now())
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> AppResult<()> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        let response = self
            .http_client
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| unavailable(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(unavailable(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_cache_control_max_age)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        let jwks: jsonwebtoken::jwk::JwkSet = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys_by_kid.insert(kid, Arc::new(key));
                }
                Err(e) => tracing::warn!(error = %e, %kid, "Skipping unusable JWKS key"),
            }
        }

        if keys_by_kid.is_empty() {
            return Err(unavailable("JWKS response had no usable keys".into()));
        }

        tracing::debug!(keys = keys_by_kid.len(), ttl_secs = ttl.as_secs(), "JWKS cache refreshed");
        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });
        Ok(())
    }
}

fn unavailable(detail: String) -> AppError {
    tracing::error!(%detail, "Identity authority unavailable");
    AppError::ServiceUnavailable("Identity service unavailable".into())
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|raw| raw.trim_matches('"').parse::<u64>().ok())
}
