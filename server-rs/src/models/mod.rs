pub mod activity;
pub mod carbon;
pub mod catalog;
pub mod community;
pub mod ledger;
pub mod mission;
pub mod notification;
pub mod user;

pub use activity::*;
pub use carbon::*;
pub use catalog::*;
pub use community::*;
pub use ledger::*;
pub use mission::*;
pub use notification::*;
pub use user::*;
