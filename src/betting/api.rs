//! Betting API Endpoints
//! Mission: Expose bets, live odds, wagers, and resolution over HTTP
//!
//! Read paths sweep expired bets before loading, so clients never see an
//! "open" bet whose close time has passed.

use crate::auth::models::Claims;
use crate::auth::user_store::UserStore;
use crate::betting::error::BetError;
use crate::betting::models::{Bet, BetStatus, WagerView};
use crate::betting::odds;
use crate::betting::store::BetStore;
use crate::config::Config;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub bets: Arc<BetStore>,
    pub users: Arc<UserStore>,
    pub config: Arc<Config>,
}

fn current_user_id(claims: &Claims) -> Result<i64, BetError> {
    claims
        .sub
        .parse::<i64>()
        .map_err(|_| BetError::InvalidArgument("Invalid token subject".to_string()))
}

// ===== Route Handlers =====

/// Health check endpoint - GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Public configuration values - GET /api/config
pub async fn get_public_config(State(state): State<AppState>) -> Json<PublicConfigResponse> {
    Json(PublicConfigResponse {
        minimum_wager: state.config.minimum_wager,
        early_bet_bonus: state.config.early_bet_bonus,
        initial_balance: state.config.initial_balance,
    })
}

/// List bets - GET /api/bets?status=
pub async fn list_bets(
    State(state): State<AppState>,
    Query(params): Query<BetListQuery>,
) -> Result<Json<Vec<BetSummary>>, BetError> {
    let now = Utc::now();
    state.bets.close_expired_bets(now).await?;

    let status = match params.status.as_deref() {
        Some(s) => Some(BetStatus::from_str(s).ok_or_else(|| {
            BetError::InvalidArgument(format!("Unknown status filter: {}", s))
        })?),
        None => None,
    };

    let bets = state.bets.list_bets(status).await?;
    Ok(Json(bets.iter().map(BetSummary::from_bet).collect()))
}

/// Bet detail with per-outcome odds - GET /api/bets/:id
pub async fn get_bet(
    State(state): State<AppState>,
    Path(bet_id): Path<i64>,
) -> Result<Json<BetDetail>, BetError> {
    let now = Utc::now();
    state.bets.close_expired_bets(now).await?;

    let bet = state.bets.get_bet(bet_id).await?;
    Ok(Json(BetDetail::from_bet(
        &bet,
        now,
        state.config.early_bet_bonus,
    )))
}

/// Create a bet - POST /api/bets
pub async fn create_bet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBetRequest>,
) -> Result<(StatusCode, Json<BetDetail>), BetError> {
    let user_id = current_user_id(&claims)?;

    if payload.title.trim().is_empty() {
        return Err(BetError::InvalidArgument("Title is required".to_string()));
    }
    if payload.outcomes.iter().any(|name| name.trim().is_empty()) {
        return Err(BetError::InvalidArgument(
            "Outcome names must not be empty".to_string(),
        ));
    }

    let now = Utc::now();
    let bet_id = state
        .bets
        .create_bet(
            user_id,
            &payload.title,
            &payload.description,
            &payload.outcomes,
            payload.close_time,
            now,
        )
        .await?;

    let bet = state.bets.get_bet(bet_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(BetDetail::from_bet(&bet, now, state.config.early_bet_bonus)),
    ))
}

/// Place a wager - POST /api/bets/:id/wager
pub async fn place_wager(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bet_id): Path<i64>,
    Json(payload): Json<WagerRequest>,
) -> Result<(StatusCode, Json<WagerView>), BetError> {
    let user_id = current_user_id(&claims)?;
    let now = Utc::now();

    let wager = state
        .bets
        .place_wager(user_id, bet_id, payload.outcome_id, payload.amount, now)
        .await?;

    let view = state.bets.get_wager_view(wager.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Resolve a bet - POST /api/bets/:id/resolve
pub async fn resolve_bet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bet_id): Path<i64>,
    Json(payload): Json<ResolveRequest>,
) -> Result<Json<BetDetail>, BetError> {
    let user_id = current_user_id(&claims)?;
    let now = Utc::now();

    let bet = state
        .bets
        .resolve_bet(bet_id, payload.winning_outcome_id, user_id, now)
        .await?;

    Ok(Json(BetDetail::from_bet(
        &bet,
        now,
        state.config.early_bet_bonus,
    )))
}

/// Wager history for the current user - GET /api/bets/users/me/wagers
pub async fn my_wagers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<WagerView>>, BetError> {
    let user_id = current_user_id(&claims)?;
    let wagers = state.bets.list_wagers_for_user(user_id).await?;
    Ok(Json(wagers))
}

/// Top users by balance - GET /api/leaderboard?limit=
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, BetError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let rows = state.users.leaderboard(limit)?;

    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(i, (username, balance))| LeaderboardEntry {
            rank: i + 1,
            username,
            balance,
        })
        .collect();
    Ok(Json(entries))
}

// ===== Request/Response Types =====

#[derive(Debug, Deserialize)]
pub struct BetListQuery {
    /// Filter by bet status ("open", "closed", or "resolved").
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBetRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub outcomes: Vec<String>,
    pub close_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct WagerRequest {
    pub outcome_id: i64,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub winning_outcome_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct PublicConfigResponse {
    pub minimum_wager: i64,
    pub early_bet_bonus: f64,
    pub initial_balance: i64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub balance: i64,
}

/// Bet in list view.
#[derive(Debug, Serialize)]
pub struct BetSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub close_time: DateTime<Utc>,
    pub status: BetStatus,
    pub created_at: DateTime<Utc>,
    pub creator_username: String,
    pub total_pool: i64,
    pub outcome_count: usize,
}

impl BetSummary {
    pub fn from_bet(bet: &Bet) -> Self {
        Self {
            id: bet.id,
            title: bet.title.clone(),
            description: bet.description.clone(),
            close_time: bet.close_time,
            status: bet.status,
            created_at: bet.created_at,
            creator_username: bet.creator_username.clone(),
            total_pool: bet.total_pool(),
            outcome_count: bet.outcomes.len(),
        }
    }
}

/// Outcome with display odds.
#[derive(Debug, Serialize)]
pub struct OutcomeWithOdds {
    pub id: i64,
    pub name: String,
    pub pool_total: i64,
    pub weighted_total: f64,
    pub odds: f64,
    pub payout_multiplier: f64,
}

/// Detailed bet view with odds per outcome.
#[derive(Debug, Serialize)]
pub struct BetDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub close_time: DateTime<Utc>,
    pub status: BetStatus,
    pub created_at: DateTime<Utc>,
    pub creator_id: i64,
    pub creator_username: String,
    pub total_pool: i64,
    pub outcomes: Vec<OutcomeWithOdds>,
    pub winning_outcome_id: Option<i64>,
    pub is_early_betting: bool,
}

impl BetDetail {
    pub fn from_bet(bet: &Bet, now: DateTime<Utc>, early_bet_bonus: f64) -> Self {
        let total_pool = bet.total_pool();
        let outcomes = bet
            .outcomes
            .iter()
            .map(|outcome| {
                let raw = odds::odds_for(outcome, total_pool);
                OutcomeWithOdds {
                    id: outcome.id,
                    name: outcome.name.clone(),
                    pool_total: outcome.pool_total(),
                    weighted_total: outcome.weighted_total(),
                    odds: odds::round2(raw),
                    payout_multiplier: odds::round2(raw),
                }
            })
            .collect();

        Self {
            id: bet.id,
            title: bet.title.clone(),
            description: bet.description.clone(),
            close_time: bet.close_time,
            status: bet.status,
            created_at: bet.created_at,
            creator_id: bet.creator_id,
            creator_username: bet.creator_username.clone(),
            total_pool,
            outcomes,
            winning_outcome_id: bet.winning_outcome_id,
            is_early_betting: odds::is_early_betting(bet, now, early_bet_bonus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::betting::models::{Outcome, Wager};
    use chrono::Duration;

    fn sample_bet() -> Bet {
        let created_at = Utc::now();
        Bet {
            id: 7,
            creator_id: 1,
            creator_username: "alice".to_string(),
            title: "Who wins the ping pong tournament?".to_string(),
            description: String::new(),
            close_time: created_at + Duration::seconds(100),
            status: BetStatus::Open,
            winning_outcome_id: None,
            created_at,
            outcomes: vec![
                Outcome {
                    id: 1,
                    bet_id: 7,
                    name: "Alice".to_string(),
                    wagers: vec![
                        Wager {
                            id: 1,
                            user_id: 1,
                            outcome_id: 1,
                            amount: 100,
                            weight: 1.2,
                            payout: None,
                            created_at,
                        },
                        Wager {
                            id: 2,
                            user_id: 2,
                            outcome_id: 1,
                            amount: 100,
                            weight: 1.0,
                            payout: None,
                            created_at,
                        },
                    ],
                },
                Outcome {
                    id: 2,
                    bet_id: 7,
                    name: "Bob".to_string(),
                    wagers: vec![Wager {
                        id: 3,
                        user_id: 3,
                        outcome_id: 2,
                        amount: 200,
                        weight: 1.0,
                        payout: None,
                        created_at,
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_detail_rounds_odds_for_display() {
        let bet = sample_bet();
        let detail = BetDetail::from_bet(&bet, bet.created_at + Duration::seconds(10), 1.2);

        assert_eq!(detail.total_pool, 400);
        // 400 / 220 and 400 / 200, rounded to 2 decimals.
        assert_eq!(detail.outcomes[0].odds, 1.82);
        assert_eq!(detail.outcomes[1].odds, 2.0);
        assert_eq!(
            detail.outcomes[0].payout_multiplier,
            detail.outcomes[0].odds
        );
        assert!(detail.is_early_betting);
    }

    #[test]
    fn test_detail_early_flag_clears_after_midpoint() {
        let bet = sample_bet();
        let detail = BetDetail::from_bet(&bet, bet.created_at + Duration::seconds(60), 1.2);
        assert!(!detail.is_early_betting);
    }

    #[test]
    fn test_summary_counts_outcomes_and_pool() {
        let bet = sample_bet();
        let summary = BetSummary::from_bet(&bet);
        assert_eq!(summary.outcome_count, 2);
        assert_eq!(summary.total_pool, 400);
        assert_eq!(summary.creator_username, "alice");
    }
}
