use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::auth::AuthSession;
use crate::models::catalog::{OrderRequest, ShopItem, ShopOrder};
use crate::routes::extract::AppJson;
use crate::services::{leaderboard, shop, tiers};
use crate::AppState;

pub async fn list_items(State(state): State<AppState>) -> AppResult<Json<Vec<ShopItem>>> {
    Ok(Json(shop::list_items(&state.db).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    AppJson(body): AppJson<OrderRequest>,
) -> AppResult<Json<ShopOrder>> {
    let user = session.synced()?;
    let order = shop::create_order(&state.db, user.id, body.item_id, body.quantity).await?;

    tiers::reconcile_best_effort(&state.db, user.id).await;
    leaderboard::invalidate(&state.cache).await;
    Ok(Json(order))
}

pub async fn my_orders(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
) -> AppResult<Json<Vec<ShopOrder>>> {
    let user = session.synced()?;
    Ok(Json(shop::list_orders(&state.db, user.id).await?))
}
