use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub node_env: String,
    pub cors_origins: Vec<String>,
    pub db: DbConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub rewards: RewardConfig,
    pub rate_limit: RateLimitConfig,
    pub leaderboard: LeaderboardConfig,
    pub cloudinary: CloudinaryConfig,
    pub fcm: FcmConfig,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_min: u32,
    pub pool_max: u32,
}

#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u8,
    pub key_prefix: String,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Firebase project id; doubles as the expected token audience.
    pub firebase_project_id: String,
    /// When set, tokens are verified as HS256 with this secret instead of
    /// against Google's signing keys. Local development and tests only.
    pub dev_secret: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RewardConfig {
    pub base_reward: i64,
    pub co2_coin_rate: f64,
    pub streak_window_days: i64,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
}

#[derive(Clone, Debug)]
pub struct LeaderboardConfig {
    pub size: i64,
    pub cache_seconds: u64,
}

#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    /// Signatures are SHA-256; the Cloudinary account must be set to accept them.
    pub api_secret: String,
    pub folder: String,
}

#[derive(Clone, Debug)]
pub struct FcmConfig {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_or_parse("PORT", 3001),
            node_env: env_or("NODE_ENV", "development"),
            cors_origins: env_or("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_or_parse("DB_PORT", 5432),
                database: env_or("DB_NAME", "ecoverse"),
                user: env_or("DB_USER", "ecoverse"),
                password: env_or("DB_PASSWORD", ""),
                pool_min: env_or_parse("DB_POOL_MIN", 2),
                pool_max: env_or_parse("DB_POOL_MAX", 20),
            },
            redis: RedisConfig {
                host: env_or("REDIS_HOST", "localhost"),
                port: env_or_parse("REDIS_PORT", 6379),
                password: env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
                db: env_or_parse("REDIS_DB", 0),
                key_prefix: "eco:".to_string(),
            },
            auth: AuthConfig {
                firebase_project_id: env_or("FIREBASE_PROJECT_ID", "ecoverse-dev"),
                dev_secret: env::var("AUTH_DEV_SECRET").ok().filter(|s| !s.is_empty()),
            },
            rewards: RewardConfig {
                base_reward: env_or_parse("REWARD_BASE", 10),
                co2_coin_rate: env_or_parse("REWARD_CO2_RATE", 5.0),
                streak_window_days: env_or_parse("STREAK_WINDOW_DAYS", 7),
            },
            rate_limit: RateLimitConfig {
                window_secs: env_or_parse("RATE_LIMIT_WINDOW_SEC", 15 * 60),
                max_requests: env_or_parse("RATE_LIMIT_MAX", 100),
            },
            leaderboard: LeaderboardConfig {
                size: env_or_parse("LEADERBOARD_SIZE", 20),
                cache_seconds: env_or_parse("LEADERBOARD_CACHE_SEC", 30),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: env_or("CLOUDINARY_CLOUD_NAME", ""),
                api_key: env_or("CLOUDINARY_API_KEY", ""),
                api_secret: env_or("CLOUDINARY_API_SECRET", ""),
                folder: env_or("CLOUDINARY_FOLDER", "ecoverse/activities"),
            },
            fcm: FcmConfig {
                project_id: env_or("FCM_PROJECT_ID", ""),
                client_email: env_or("FCM_CLIENT_EMAIL", ""),
                // Keys pasted into .env files usually carry literal "\n" sequences.
                private_key: env_or("FCM_PRIVATE_KEY", "").replace("\\n", "\n"),
            },
        }
    }

    /// Offline configuration for tests: dev-secret auth, no collaborators.
    pub fn test_default() -> Self {
        Self {
            port: 0,
            node_env: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            db: DbConfig {
                host: "127.0.0.1".to_string(),
                port: 5432,
                database: "ecoverse_test".to_string(),
                user: "ecoverse".to_string(),
                password: String::new(),
                pool_min: 0,
                pool_max: 2,
            },
            redis: RedisConfig {
                host: "127.0.0.1".to_string(),
                port: 6379,
                password: None,
                db: 0,
                key_prefix: "eco-test:".to_string(),
            },
            auth: AuthConfig {
                firebase_project_id: "ecoverse-test".to_string(),
                dev_secret: Some("test-secret-at-least-32-bytes-long!!".to_string()),
            },
            rewards: RewardConfig {
                base_reward: 10,
                co2_coin_rate: 5.0,
                streak_window_days: 7,
            },
            rate_limit: RateLimitConfig {
                window_secs: 60,
                max_requests: 1000,
            },
            leaderboard: LeaderboardConfig {
                size: 20,
                cache_seconds: 0,
            },
            cloudinary: CloudinaryConfig {
                cloud_name: String::new(),
                api_key: String::new(),
                api_secret: String::new(),
                folder: "ecoverse/test".to_string(),
            },
            fcm: FcmConfig {
                project_id: String::new(),
                client_email: String::new(),
                private_key: String::new(),
            },
        }
    }

    pub fn database_url(&self) -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db.user, self.db.password, self.db.host, self.db.port, self.db.database
        )
    }

    pub fn redis_url(&self) -> String {
        if let Ok(url) = env::var("REDIS_URL") {
            return url;
        }
        match &self.redis.password {
            Some(pw) if !pw.is_empty() => format!(
                "redis://:{}@{}:{}/{}",
                pw, self.redis.host, self.redis.port, self.redis.db
            ),
            _ => format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.db
            ),
        }
    }

    pub fn is_production(&self) -> bool {
        self.node_env == "production"
    }
}
