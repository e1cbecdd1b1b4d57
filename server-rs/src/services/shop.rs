use sqlx::PgPool;
use uuid::Uuid;

use crate::db::UnitOfWork;
use crate::error::{AppError, AppResult};
use crate::models::catalog::{total_cost, ShopItem, ShopOrder};
use crate::models::ledger::LedgerKind;
use crate::services::ledger;

/// Active items, cheapest first.
pub async fn list_items(db: &PgPool) -> AppResult<Vec<ShopItem>> {
    let items = sqlx::query_as::<_, ShopItem>(
        "SELECT * FROM shop_items WHERE is_active = TRUE ORDER BY price ASC, name ASC",
    )
    .fetch_all(db)
    .await?;
    Ok(items)
}

/// Buys `quantity` of an item. Debit, stock decrement and order row commit
/// together or not at all.
pub async fn create_order(
    db: &PgPool,
    user_id: Uuid,
    item_id: Uuid,
    quantity: Option<i32>,
) -> AppResult<ShopOrder> {
    let mut uow = UnitOfWork::begin(db).await?;

    let item = sqlx::query_as::<_, ShopItem>(
        "SELECT * FROM shop_items WHERE id = $1 AND is_active = TRUE FOR UPDATE",
    )
    .bind(item_id)
    .fetch_optional(uow.conn())
    .await?
    .ok_or_else(|| AppError::NotFound("Item not found".into()))?;

    let (quantity, total) = total_cost(item.price, quantity)?;

    // Balance is checked before stock.
    let order_id = Uuid::new_v4();
    let balance = ledger::debit(&mut uow, user_id, total, LedgerKind::ShopOrder, order_id).await?;
    if item.stock < quantity {
        uow.rollback().await?;
        return Err(AppError::Conflict("Insufficient stock".into()));
    }

    sqlx::query("UPDATE shop_items SET stock = stock - $1 WHERE id = $2")
        .bind(quantity)
        .bind(item_id)
        .execute(uow.conn())
        .await?;

    let order = sqlx::query_as::<_, ShopOrder>(
        r#"INSERT INTO shop_orders (id, user_id, item_id, quantity, total_cost, status, created_at)
        VALUES ($1, $2, $3, $4, $5, 'PENDING', NOW())
        RETURNING *"#,
    )
    .bind(order_id)
    .bind(user_id)
    .bind(item_id)
    .bind(quantity)
    .bind(total)
    .fetch_one(uow.conn())
    .await?;

    uow.commit().await?;

    tracing::info!(%order_id, %user_id, %item_id, quantity, total, balance, "Order created");
    Ok(order)
}

/// The user's orders, newest first.
pub async fn list_orders(db: &PgPool, user_id: Uuid) -> AppResult<Vec<ShopOrder>> {
    let orders = sqlx::query_as::<_, ShopOrder>(
        "SELECT * FROM shop_orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(orders)
}
