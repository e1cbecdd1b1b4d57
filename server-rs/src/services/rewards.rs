//! Reward and streak policy applied when an activity is approved.

use chrono::{DateTime, Utc};

use crate::config::RewardConfig;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
/// Ceiling on the CO2 bonus of a single approval.
pub const MAX_CO2_BONUS: i64 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardPolicy {
    pub base_reward: i64,
    pub co2_coin_rate: f64,
    pub streak_window_days: i64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            base_reward: 10,
            co2_coin_rate: 5.0,
            streak_window_days: 7,
        }
    }
}

impl From<&RewardConfig> for RewardPolicy {
    fn from(config: &RewardConfig) -> Self {
        Self {
            base_reward: config.base_reward,
            co2_coin_rate: config.co2_coin_rate,
            streak_window_days: config.streak_window_days,
        }
    }
}

impl RewardPolicy {
    /// `base + round(co2 × rate)`; an unmeasured saving earns the base only.
    /// The bonus is capped at [`MAX_CO2_BONUS`] and the sum saturates.
    pub fn reward_for(&self, co2_saved: Option<f64>) -> i64 {
        let bonus = (co2_saved.unwrap_or(0.0) * self.co2_coin_rate).round();
        let bonus = if bonus.is_nan() || bonus <= 0.0 {
            0
        } else {
            bonus.min(MAX_CO2_BONUS as f64) as i64
        };
        self.base_reward.max(0).saturating_add(bonus)
    }

    /// Streak after an approval at `now`.
    ///
    /// The gap is measured in whole days rounded up, using the absolute
    /// difference, so a `last_activity` in the future counts the same as one
    /// in the past.
    pub fn next_streak(
        &self,
        current: i32,
        last_activity: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> i32 {
        let Some(last) = last_activity else {
            return 1;
        };
        if elapsed_days(last, now) <= self.streak_window_days {
            current.saturating_add(1)
        } else {
            1
        }
    }
}

fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let ms = (to - from).num_milliseconds().abs();
    (ms + DAY_MS - 1) / DAY_MS
}
