pub mod activities;
pub mod carbon;
pub mod circles;
pub mod evidence;
pub mod identity;
pub mod leaderboard;
pub mod ledger;
pub mod missions;
pub mod notifications;
pub mod push;
pub mod rewards;
pub mod shop;
pub mod stats;
pub mod tiers;
pub mod tours;
pub mod users;
pub mod verification;
