pub mod activities;
pub mod admin;
pub mod carbon;
pub mod circles;
pub mod extract;
pub mod health;
pub mod missions;
pub mod notifications;
pub mod shop;
pub mod tours;
pub mod user;
