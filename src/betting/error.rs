//! Betting Error Taxonomy
//! Mission: One distinguishable error kind per admission/resolution failure

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Domain errors reported synchronously to the caller. None are retried
/// internally.
#[derive(Debug)]
pub enum BetError {
    /// Bet, outcome, wager, or user absent.
    NotFound(&'static str),
    /// Bet not open, or already resolved.
    InvalidState(&'static str),
    /// Bad input: outcome not in bet, close time in the past, stake below
    /// minimum.
    InvalidArgument(String),
    /// Balance below the requested stake.
    InsufficientFunds,
    /// Non-creator attempting resolution.
    Forbidden(&'static str),
    /// Duplicate username at registration.
    Conflict(&'static str),
    Database(anyhow::Error),
}

impl From<rusqlite::Error> for BetError {
    fn from(err: rusqlite::Error) -> Self {
        BetError::Database(err.into())
    }
}

impl From<anyhow::Error> for BetError {
    fn from(err: anyhow::Error) -> Self {
        BetError::Database(err)
    }
}

impl IntoResponse for BetError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            BetError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            BetError::InvalidState(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            BetError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            BetError::InsufficientFunds => {
                (StatusCode::BAD_REQUEST, "Insufficient balance".to_string())
            }
            BetError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.to_string()),
            BetError::Conflict(msg) => (StatusCode::CONFLICT, msg.to_string()),
            BetError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            BetError::NotFound("Bet not found").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BetError::InvalidState("Bet has already been resolved")
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BetError::InsufficientFunds.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BetError::Forbidden("Only the bet creator can resolve this bet")
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            BetError::Conflict("Username already registered")
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_database_error_conversion() {
        let err = anyhow::anyhow!("boom");
        let bet_err: BetError = err.into();
        match bet_err {
            BetError::Database(_) => (),
            other => panic!("Expected Database error, got {:?}", other),
        }
    }
}
