//! Pari-Mutuel Odds Engine
//! Mission: Compute live odds and early-bet weights from current pool state
//!
//! Everything here is a pure function over a loaded [`Bet`] aggregate.
//! Degenerate pools (nothing wagered) yield zero odds, never an error.

use crate::betting::models::{Bet, Outcome};
use chrono::{DateTime, Utc};

/// Weight multiplier for a wager placed at `now`.
///
/// Returns `bonus` inside the first half of the bet's open window, 1.0
/// afterwards. The result is locked into the wager at placement and never
/// recomputed.
pub fn weight_for(bet: &Bet, now: DateTime<Utc>, bonus: f64) -> f64 {
    let window = bet.close_time - bet.created_at;
    let elapsed = now - bet.created_at;
    if elapsed < window / 2 {
        bonus
    } else {
        1.0
    }
}

/// Whether the early-bet bonus currently applies to new wagers.
///
/// Display-only: independent of any individual wager's locked-in weight.
pub fn is_early_betting(bet: &Bet, now: DateTime<Utc>, bonus: f64) -> bool {
    weight_for(bet, now, bonus) > 1.0 && bet.is_open(now)
}

/// Live odds for one outcome: coins returned per coin of weighted stake.
///
/// Unrounded; callers round to 2 decimals for display only. The payout
/// multiplier is the same value.
pub fn odds_for(outcome: &Outcome, total_pool: i64) -> f64 {
    let weighted = outcome.weighted_total();
    if weighted > 0.0 && total_pool > 0 {
        total_pool as f64 / weighted
    } else {
        0.0
    }
}

/// Round to 2 decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
