use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::UnitOfWork;
use crate::error::{AppError, AppResult};
use crate::models::catalog::{total_cost, AgriTour, AgriTourBooking};
use crate::models::ledger::LedgerKind;
use crate::services::ledger;

pub async fn list_tours(db: &PgPool) -> AppResult<Vec<AgriTour>> {
    let tours = sqlx::query_as::<_, AgriTour>(
        "SELECT * FROM agri_tours WHERE is_active = TRUE ORDER BY created_at DESC",
    )
    .fetch_all(db)
    .await?;
    Ok(tours)
}

pub async fn book(
    db: &PgPool,
    user_id: Uuid,
    tour_id: Uuid,
    tickets: Option<i32>,
    booking_date: DateTime<Utc>,
) -> AppResult<AgriTourBooking> {
    let mut uow = UnitOfWork::begin(db).await?;

    let price: i64 =
        sqlx::query_scalar("SELECT price FROM agri_tours WHERE id = $1 AND is_active = TRUE")
            .bind(tour_id)
            .fetch_optional(uow.conn())
            .await?
            .ok_or_else(|| AppError::NotFound("Tour not found".into()))?;

    let (tickets, total) = total_cost(price, tickets)?;

    let booking_id = Uuid::new_v4();
    let balance =
        ledger::debit(&mut uow, user_id, total, LedgerKind::TourBooking, booking_id).await?;

    let booking = sqlx::query_as::<_, AgriTourBooking>(
        r#"INSERT INTO agri_tour_bookings (id, user_id, tour_id, tickets, total_cost, booking_date, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', NOW())
        RETURNING *"#,
    )
    .bind(booking_id)
    .bind(user_id)
    .bind(tour_id)
    .bind(tickets)
    .bind(total)
    .bind(booking_date)
    .fetch_one(uow.conn())
    .await?;

    uow.commit().await?;

    tracing::info!(%booking_id, %user_id, %tour_id, tickets, total, balance, "Tour booked");
    Ok(booking)
}

pub async fn list_bookings(db: &PgPool, user_id: Uuid) -> AppResult<Vec<AgriTourBooking>> {
    let bookings = sqlx::query_as::<_, AgriTourBooking>(
        "SELECT * FROM agri_tour_bookings WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(bookings)
}
