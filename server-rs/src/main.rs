use std::net::SocketAddr;

use ecoverse_api::cache::Cache;
use ecoverse_api::config::Config;
use ecoverse_api::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .json()
        .init();

    if config.is_production() && config.auth.dev_secret.is_some() {
        return Err("AUTH_DEV_SECRET must not be set in production".into());
    }

    let pool = db::create_pool(&config).await?;
    db::migrate(&pool).await?;
    tracing::info!("Database migrations applied");

    let cache = Cache::connect(&config).await;
    let port = config.port;
    let state = AppState::new(config, pool, cache)?;
    let router = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "EcoVerse API listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
    }
    tracing::info!("Shutting down");
}
