use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::auth::AuthSession;
use crate::models::catalog::{parse_booking_date, AgriTour, AgriTourBooking, BookingRequest};
use crate::routes::extract::AppJson;
use crate::services::{leaderboard, tiers, tours};
use crate::AppState;

pub async fn list_tours(State(state): State<AppState>) -> AppResult<Json<Vec<AgriTour>>> {
    Ok(Json(tours::list_tours(&state.db).await?))
}

pub async fn book_tour(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
    AppJson(body): AppJson<BookingRequest>,
) -> AppResult<Json<AgriTourBooking>> {
    let user = session.synced()?;
    let booking_date = parse_booking_date(&body.booking_date)?;
    let booking =
        tours::book(&state.db, user.id, body.tour_id, body.tickets, booking_date).await?;

    tiers::reconcile_best_effort(&state.db, user.id).await;
    leaderboard::invalidate(&state.cache).await;
    Ok(Json(booking))
}

pub async fn my_bookings(
    State(state): State<AppState>,
    session: axum::Extension<AuthSession>,
) -> AppResult<Json<Vec<AgriTourBooking>>> {
    let user = session.synced()?;
    Ok(Json(tours::list_bookings(&state.db, user.id).await?))
}
