//! EcoVerse API: activity verification, EcoCoin rewards and the catalog
//! they can be spent in.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_mw,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use cache::Cache;
use config::Config;
use error::AppResult;
use middleware::rate_limit::RateLimiter;
use services::evidence::EvidenceStore;
use services::identity::IdentityResolver;
use services::push::PushClient;
use services::rewards::RewardPolicy;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: Cache,
    pub config: Arc<Config>,
    pub identity: Arc<IdentityResolver>,
    pub evidence: Option<Arc<EvidenceStore>>,
    pub push: Option<Arc<PushClient>>,
    pub rewards: RewardPolicy,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wires collaborators from configuration. Evidence storage and push are
    /// optional; missing credentials disable them.
    pub fn new(config: Config, db: PgPool, cache: Cache) -> AppResult<Self> {
        let identity = IdentityResolver::new(&config.auth)?;

        let evidence = EvidenceStore::from_config(&config.cloudinary)?.map(Arc::new);
        if evidence.is_none() {
            tracing::warn!("Cloudinary not configured; image uploads disabled");
        }

        let push = match PushClient::from_config(&config.fcm) {
            Ok(push) => push.map(Arc::new),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid FCM credentials; push disabled");
                None
            }
        };
        if push.is_none() {
            tracing::warn!("Push notifications disabled");
        }

        let rate_limiter =
            RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_secs);

        Ok(Self {
            db,
            cache,
            rewards: RewardPolicy::from(&config.rewards),
            config: Arc::new(config),
            identity: Arc::new(identity),
            evidence,
            push,
            rate_limiter,
        })
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer.allow_origin(origins)
}

pub fn build_router(state: AppState) -> Router {
    // --- User routes ---
    let user_routes = Router::new()
        .route("/sync", post(routes::user::sync))
        .route("/profile", get(routes::user::profile))
        .route("/stats", get(routes::user::user_stats))
        .route("/transactions", get(routes::user::transactions))
        .route("/fcm-token", put(routes::user::register_fcm_token))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .route("/leaderboard", get(routes::user::get_leaderboard));

    // --- Activity routes ---
    let activity_admin_routes = Router::new()
        .route("/pending", get(routes::activities::list_pending))
        .route("/:id/verify", patch(routes::activities::verify))
        .layer(axum_mw::from_fn(middleware::admin::require_admin));

    let activity_routes = Router::new()
        .route(
            "/",
            post(routes::activities::submit).get(routes::activities::list_mine),
        )
        .merge(activity_admin_routes)
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // --- Catalog/exchange routes ---
    let mission_routes = Router::new()
        .route("/mine", get(routes::missions::my_missions))
        .route("/:id/join", post(routes::missions::join_mission))
        .route("/:id/progress", patch(routes::missions::update_progress))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .route("/", get(routes::missions::list_missions));

    let shop_routes = Router::new()
        .route(
            "/orders",
            post(routes::shop::create_order).get(routes::shop::my_orders),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .route("/items", get(routes::shop::list_items));

    let tour_routes = Router::new()
        .route("/book", post(routes::tours::book_tour))
        .route("/bookings", get(routes::tours::my_bookings))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .route("/", get(routes::tours::list_tours));

    let circle_routes = Router::new()
        .route("/:id/join", post(routes::circles::join_circle))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .route("/", get(routes::circles::list_circles));

    let carbon_routes = Router::new()
        .route("/calculate", post(routes::carbon::calculate))
        .route("/my-credits", get(routes::carbon::my_credits))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // --- Admin routes ---
    let admin_routes = Router::new()
        .route("/stats", get(routes::admin::platform_stats))
        .route("/tiers/reconcile", post(routes::admin::reconcile_tiers))
        .layer(axum_mw::from_fn(middleware::admin::require_admin))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let notification_routes = Router::new()
        .route("/send", post(routes::notifications::send))
        .layer(axum_mw::from_fn(middleware::admin::require_admin))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // --- Compose full API ---
    let api = Router::new()
        .route("/health", get(routes::health::health))
        .nest("/user", user_routes)
        .nest("/activities", activity_routes)
        .nest("/missions", mission_routes)
        .nest("/shop", shop_routes)
        .nest("/tours", tour_routes)
        .nest("/circles", circle_routes)
        .nest("/carbon", carbon_routes)
        .nest("/admin", admin_routes)
        .nest("/notifications", notification_routes);

    Router::new()
        .nest("/api", api)
        // Global middleware
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
