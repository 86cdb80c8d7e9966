//! Betting Module
//! Mission: Pari-mutuel pools, odds, wager admission, and payout distribution

pub mod api;
pub mod error;
pub mod models;
pub mod odds;
pub mod store;

pub use api::AppState;
pub use error::BetError;
pub use models::{Bet, BetStatus, Outcome, Wager, WagerView};
pub use store::BetStore;
