use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub category: Option<String>,
    pub stock: i32,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShopOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    pub total_cost: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AgriTour {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub price: i64,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AgriTourBooking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tour_id: Uuid,
    pub tickets: i32,
    pub total_cost: i64,
    pub booking_date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub item_id: Uuid,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub tour_id: Uuid,
    pub tickets: Option<i32>,
    pub booking_date: String,
}

/// `unit_price × quantity`, with quantity defaulting to 1 and required to be ≥ 1.
pub fn total_cost(unit_price: i64, quantity: Option<i32>) -> AppResult<(i32, i64)> {
    let quantity = quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }
    let total = unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
    Ok((quantity, total))
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_booking_date(raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::BadRequest("bookingDate must be a date".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn quantity_defaults_to_one() {
        assert_eq!(total_cost(200, None).unwrap(), (1, 200));
        assert_eq!(total_cost(30, Some(3)).unwrap(), (3, 90));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        assert!(matches!(total_cost(200, Some(0)), Err(AppError::BadRequest(_))));
        assert!(matches!(total_cost(200, Some(-2)), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        assert!(matches!(
            total_cost(i64::MAX / 2, Some(3)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn booking_dates_parse_in_both_forms() {
        let d = parse_booking_date("2026-11-02").unwrap();
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2026, 11, 2, 0));
        let d = parse_booking_date("2026-11-02T09:30:00+02:00").unwrap();
        assert_eq!(d.hour(), 7);
        assert!(parse_booking_date("next tuesday").is_err());
    }
}
