//! Betting Data Model
//! Mission: Represent bets, outcomes, and wagers as fully loaded aggregates
//!
//! Pool totals and open/closed checks are recomputed from the loaded wagers
//! on every read, never cached in the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a bet. Open -> Closed (expiry) and Open/Closed ->
/// Resolved (payout); Resolved is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BetStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "resolved")]
    Resolved,
}

impl BetStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BetStatus::Open => "open",
            BetStatus::Closed => "closed",
            BetStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(BetStatus::Open),
            "closed" => Some(BetStatus::Closed),
            "resolved" => Some(BetStatus::Resolved),
            _ => None,
        }
    }
}

/// A single stake placed by a user on one outcome.
///
/// Immutable after creation except for `payout`, which is written exactly
/// once when the parent bet resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wager {
    pub id: i64,
    pub user_id: i64,
    pub outcome_id: i64,
    pub amount: i64,
    /// 1.0, or the configured early-bet bonus. Fixed at placement time.
    pub weight: f64,
    pub payout: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Wager {
    pub fn weighted_amount(&self) -> f64 {
        self.amount as f64 * self.weight
    }
}

/// A possible result of a bet, owning its wagers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub id: i64,
    pub bet_id: i64,
    pub name: String,
    pub wagers: Vec<Wager>,
}

impl Outcome {
    /// Sum of wager amounts on this outcome.
    pub fn pool_total(&self) -> i64 {
        self.wagers.iter().map(|w| w.amount).sum()
    }

    /// Sum of amount x weight over this outcome's wagers.
    pub fn weighted_total(&self) -> f64 {
        self.wagers.iter().map(Wager::weighted_amount).sum()
    }
}

/// A betting event with at least two outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: i64,
    pub creator_id: i64,
    pub creator_username: String,
    pub title: String,
    pub description: String,
    pub close_time: DateTime<Utc>,
    pub status: BetStatus,
    /// Set iff status is Resolved, and then references one of `outcomes`.
    pub winning_outcome_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub outcomes: Vec<Outcome>,
}

impl Bet {
    /// Whether the bet still accepts wagers at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == BetStatus::Open && now < self.close_time
    }

    /// Total amount wagered across all outcomes.
    pub fn total_pool(&self) -> i64 {
        self.outcomes.iter().map(Outcome::pool_total).sum()
    }

    pub fn outcome(&self, outcome_id: i64) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.id == outcome_id)
    }
}

/// A wager joined with its outcome and bet for history views.
#[derive(Debug, Clone, Serialize)]
pub struct WagerView {
    pub id: i64,
    pub outcome_id: i64,
    pub outcome_name: String,
    pub bet_id: i64,
    pub bet_title: String,
    pub amount: i64,
    pub weight: f64,
    pub payout: Option<i64>,
    pub created_at: DateTime<Utc>,
}
