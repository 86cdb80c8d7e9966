//! Application Configuration
//! Mission: Load all tunables from the environment once, at startup

use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "dev-secret-key-change-in-production";

/// Application configuration, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_expire_hours: i64,
    /// OfficeCoins granted to every new account.
    pub initial_balance: i64,
    /// Smallest stake a wager may carry.
    pub minimum_wager: i64,
    /// Weight multiplier for wagers placed in the first half of a bet's window.
    pub early_bet_bonus: f64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let db_path = std::env::var("OFFICEBOOK_DB_PATH")
            .unwrap_or_else(|_| "./data/officebook.db".to_string());

        let bind_addr = std::env::var("OFFICEBOOK_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string());

        let jwt_secret = std::env::var("OFFICEBOOK_JWT_SECRET")
            .unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
        if jwt_secret == DEFAULT_JWT_SECRET {
            warn!("Using default JWT secret; set OFFICEBOOK_JWT_SECRET in production");
        }

        let jwt_expire_hours = std::env::var("OFFICEBOOK_JWT_EXPIRE_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(24 * 7);

        let initial_balance = std::env::var("OFFICEBOOK_INITIAL_BALANCE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v >= 0)
            .unwrap_or(1000);

        let minimum_wager = std::env::var("OFFICEBOOK_MINIMUM_WAGER")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(50);

        let early_bet_bonus = std::env::var("OFFICEBOOK_EARLY_BET_BONUS")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|&v| v >= 1.0)
            .unwrap_or(1.2);

        Ok(Self {
            db_path,
            bind_addr,
            jwt_secret,
            jwt_expire_hours,
            initial_balance,
            minimum_wager,
            early_bet_bonus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_env_unset() {
        // Only checks defaults for keys that are very unlikely to be set in CI.
        let config = Config::from_env().unwrap();
        assert!(config.minimum_wager > 0);
        assert!(config.early_bet_bonus >= 1.0);
        assert!(config.initial_balance >= 0);
    }
}
