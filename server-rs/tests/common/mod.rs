use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request};
use ecoverse_api::cache::Cache;
use ecoverse_api::config::Config;
use ecoverse_api::models::{Role, User};
use ecoverse_api::{build_router, AppState};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

/// Database URL for scenario tests, if one is configured.
#[allow(dead_code)]
pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// Skip test with message if no test database is configured.
#[macro_export]
macro_rules! require_database {
    () => {
        if crate::common::database_url().is_none() {
            eprintln!("⚠️  Skipping: TEST_DATABASE_URL not set");
            return;
        }
    };
}

/// A pool that never connects unless a query runs. Offline tests must only
/// hit paths that fail before touching the store.
#[allow(dead_code)]
pub fn offline_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy("postgres://ecoverse@127.0.0.1:1/ecoverse_test")
        .expect("lazy pool")
}

/// Connects to the test database and applies migrations.
#[allow(dead_code)]
pub async fn test_db() -> PgPool {
    let url = database_url().expect("TEST_DATABASE_URL not set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");
    ecoverse_api::db::migrate(&pool)
        .await
        .expect("Failed to apply migrations");
    pool
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config, pool: PgPool) -> (axum::Router, AppState) {
    let cache = Cache::disabled(config.redis.key_prefix.clone());
    let state = AppState::new(config, pool, cache).expect("test state");
    (build_router(state.clone()), state)
}

/// Create a test app with an offline pool and no collaborators.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, AppState) {
    create_test_app_with(Config::test_default(), offline_pool())
}

/// Mints an identity token the dev verifier accepts.
#[allow(dead_code)]
pub fn mint_token(config: &Config, uid: &str, extra: Value) -> String {
    let project = &config.auth.firebase_project_id;
    let secret = config.auth.dev_secret.as_deref().expect("dev secret");
    let now = chrono::Utc::now().timestamp();

    let mut claims = json!({
        "sub": uid,
        "aud": project,
        "iss": format!("https://securetoken.google.com/{project}"),
        "iat": now,
        "exp": now + 3600,
    });
    if let (Some(base), Some(extra)) = (claims.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("encode token")
}

#[allow(dead_code)]
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn send_json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

#[allow(dead_code)]
pub fn unique_uid(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Inserts a user directly, bypassing sync, with the given balance and role.
#[allow(dead_code)]
pub async fn insert_user(pool: &PgPool, eco_coins: i64, role: Role) -> User {
    let uid = unique_uid("user");
    sqlx::query_as::<_, User>(
        r#"INSERT INTO users (firebase_uid, email, display_name, eco_coins, tier, role)
        VALUES ($1, $2, 'Tester', $3, $4, $5)
        RETURNING *"#,
    )
    .bind(&uid)
    .bind(format!("{uid}@example.com"))
    .bind(eco_coins)
    .bind(ecoverse_api::models::Tier::for_balance(eco_coins))
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("insert user")
}

#[allow(dead_code)]
pub async fn insert_activity(pool: &PgPool, user_id: Uuid, co2_saved: Option<f64>) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO activities (user_id, activity_type, title, co2_saved) VALUES ($1, 'CYCLING', 'Bike commute', $2) RETURNING id",
    )
    .bind(user_id)
    .bind(co2_saved)
    .fetch_one(pool)
    .await
    .expect("insert activity")
}

#[allow(dead_code)]
pub async fn insert_shop_item(pool: &PgPool, price: i64, stock: i32) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO shop_items (name, price, stock) VALUES ('Bamboo bottle', $1, $2) RETURNING id",
    )
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("insert shop item")
}

#[allow(dead_code)]
pub async fn insert_mission(pool: &PgPool, reward: i64) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO missions (title, mission_type, duration, reward) VALUES ('Plastic-free week', 'WEEKLY', 7, $1) RETURNING id",
    )
    .bind(reward)
    .fetch_one(pool)
    .await
    .expect("insert mission")
}

#[allow(dead_code)]
pub async fn balance_of(pool: &PgPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT eco_coins FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("balance")
}

#[allow(dead_code)]
pub async fn insert_tour(pool: &PgPool, price: i64) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO agri_tours (name, location, price) VALUES ('Mango orchard walk', 'Ratnagiri', $1) RETURNING id",
    )
    .bind(price)
    .fetch_one(pool)
    .await
    .expect("insert tour")
}

#[allow(dead_code)]
pub async fn insert_circle(pool: &PgPool) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO eco_circles (name, location) VALUES ('Lake cleanup crew', 'Pune') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .expect("insert circle")
}

/// Pins an activity's submission time so ordering tests do not depend on clock resolution.
#[allow(dead_code)]
pub async fn set_submitted_at(pool: &PgPool, activity_id: Uuid, submitted_at: &str) {
    sqlx::query("UPDATE activities SET created_at = $1::timestamptz WHERE id = $2")
        .bind(submitted_at)
        .bind(activity_id)
        .execute(pool)
        .await
        .expect("set submitted_at");
}
