use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::config::Config;

/// Redis-backed cache. Without a connection every call is a no-op miss, so
/// the API keeps serving when Redis is down.
#[derive(Clone)]
pub struct Cache {
    conn: Option<ConnectionManager>,
    prefix: String,
}

impl Cache {
    pub async fn connect(config: &Config) -> Self {
        let prefix = config.redis.key_prefix.clone();
        let client = match Client::open(config.redis_url()) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid Redis URL; caching disabled");
                return Self::disabled(prefix);
            }
        };
        match ConnectionManager::new(client).await {
            Ok(conn) => {
                tracing::info!("Redis connected");
                Self {
                    conn: Some(conn),
                    prefix,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable; caching disabled");
                Self::disabled(prefix)
            }
        }
    }

    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self {
            conn: None,
            prefix: prefix.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    fn key(&self, k: &str) -> String {
        format!("{}{}", self.prefix, k)
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone()?;
        match conn.get::<_, Option<String>>(self.key(key)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, key, "Cache read failed");
                None
            }
        }
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .await
            .and_then(|s| serde_json::from_str(&s).ok())
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let k = self.key(key);
        let result: Result<(), _> = if ttl_secs > 0 {
            conn.set_ex(&k, value, ttl_secs).await
        } else {
            conn.set(&k, value).await
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, key, "Cache write failed");
        }
    }

    pub async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        if let Ok(json) = serde_json::to_string(value) {
            self.set(key, &json, ttl_secs).await;
        }
    }

    pub async fn del(&self, key: &str) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        if let Err(e) = conn.del::<_, ()>(self.key(key)).await {
            tracing::warn!(error = %e, key, "Cache delete failed");
        }
    }

    pub async fn health_check(&self) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .is_ok()
    }
}
