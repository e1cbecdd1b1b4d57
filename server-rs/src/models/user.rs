use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Member,
    Admin,
}

/// Ordered so that `Base < Silver < Gold < Platinum`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_tier", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Base,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub const SILVER_ABOVE: i64 = 500;
    pub const GOLD_ABOVE: i64 = 2000;
    pub const PLATINUM_ABOVE: i64 = 5000;

    /// The tier a balance earns. Thresholds are exclusive: 500 coins is still BASE.
    pub fn for_balance(eco_coins: i64) -> Tier {
        if eco_coins > Self::PLATINUM_ABOVE {
            Tier::Platinum
        } else if eco_coins > Self::GOLD_ABOVE {
            Tier::Gold
        } else if eco_coins > Self::SILVER_ABOVE {
            Tier::Silver
        } else {
            Tier::Base
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub firebase_uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing)]
    pub fcm_token: Option<String>,
    pub eco_coins: i64,
    pub streak: i32,
    pub tier: Tier,
    pub last_activity_date: Option<DateTime<Utc>>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub eco_coins: i64,
    pub tier: Tier,
    pub streak: i32,
}

#[derive(Debug, Deserialize)]
pub struct FcmTokenRequest {
    #[serde(rename = "fcmToken")]
    pub fcm_token: String,
}
