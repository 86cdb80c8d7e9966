//! Bet Storage
//! Mission: Transactional pari-mutuel state with SQLite
//!
//! All financial mutations (wager admission, resolution) run inside a single
//! rusqlite transaction on one shared connection behind an async mutex, so
//! concurrent requests serialize: a wager cannot race a resolution and a
//! resolution sees every committed wager.

use crate::betting::error::BetError;
use crate::betting::models::{Bet, BetStatus, Outcome, Wager, WagerView};
use crate::betting::odds;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

const SWEEP_SQL: &str =
    "UPDATE bets SET status = 'closed' WHERE status = 'open' AND close_time <= ?1";

/// Bet/outcome/wager storage with SQLite backend.
pub struct BetStore {
    conn: Arc<Mutex<Connection>>,
    minimum_wager: i64,
    early_bet_bonus: f64,
}

impl BetStore {
    /// Open the database, initialize the schema, and fix the stake policy
    /// for the process lifetime.
    pub fn new(db_path: &str, minimum_wager: i64, early_bet_bonus: f64) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open betting database")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        // Schema shared with auth::UserStore; both CREATE statements must
        // stay identical.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                balance INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS bets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                close_time TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                winning_outcome_id INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY (creator_id) REFERENCES users(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS outcomes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bet_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                FOREIGN KEY (bet_id) REFERENCES bets(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS wagers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                outcome_id INTEGER NOT NULL,
                amount INTEGER NOT NULL,
                weight REAL NOT NULL DEFAULT 1.0,
                payout INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (outcome_id) REFERENCES outcomes(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_outcomes_bet ON outcomes(bet_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_wagers_outcome ON wagers(outcome_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_wagers_user ON wagers(user_id)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            minimum_wager,
            early_bet_bonus,
        })
    }

    /// Create a new bet with its outcomes.
    pub async fn create_bet(
        &self,
        creator_id: i64,
        title: &str,
        description: &str,
        outcome_names: &[String],
        close_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<i64, BetError> {
        if close_time <= now {
            return Err(BetError::InvalidArgument(
                "Close time must be in the future".to_string(),
            ));
        }
        if outcome_names.len() < 2 {
            return Err(BetError::InvalidArgument(
                "A bet needs at least two outcomes".to_string(),
            ));
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(BetError::from)?;

        tx.execute(
            "INSERT INTO bets (creator_id, title, description, close_time, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'open', ?5)",
            params![
                creator_id,
                title,
                description,
                close_time.to_rfc3339(),
                now.to_rfc3339()
            ],
        )?;
        let bet_id = tx.last_insert_rowid();

        for name in outcome_names {
            tx.execute(
                "INSERT INTO outcomes (bet_id, name) VALUES (?1, ?2)",
                params![bet_id, name],
            )?;
        }

        tx.commit().map_err(BetError::from)?;
        info!(bet_id, creator_id, title, "Bet created");
        Ok(bet_id)
    }

    /// Load a bet with its outcomes and wagers.
    pub async fn get_bet(&self, bet_id: i64) -> Result<Bet, BetError> {
        let conn = self.conn.lock().await;
        load_bet(&conn, bet_id)?.ok_or(BetError::NotFound("Bet not found"))
    }

    /// List bets newest first, optionally filtered by status.
    pub async fn list_bets(&self, status: Option<BetStatus>) -> Result<Vec<Bet>, BetError> {
        let conn = self.conn.lock().await;

        let ids: Vec<i64> = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT id FROM bets WHERE status = ?1 ORDER BY created_at DESC, id DESC",
                )?;
                let rows = stmt.query_map(params![status.as_str()], |row| row.get(0))?;
                rows.collect::<std::result::Result<_, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT id FROM bets ORDER BY created_at DESC, id DESC")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<std::result::Result<_, _>>()?
            }
        };

        let mut bets = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bet) = load_bet(&conn, id)? {
                bets.push(bet);
            }
        }
        Ok(bets)
    }

    /// Transition every open bet past its close time to closed.
    ///
    /// Idempotent and monotonic (open -> closed only); safe to call
    /// redundantly from every read path.
    pub async fn close_expired_bets(&self, now: DateTime<Utc>) -> Result<usize, BetError> {
        let conn = self.conn.lock().await;
        // RFC3339 UTC strings compare lexicographically in timestamp order.
        let closed = conn.execute(SWEEP_SQL, params![now.to_rfc3339()])?;
        if closed > 0 {
            info!(closed, "Expired bets closed");
        }
        Ok(closed)
    }

    /// Admit a wager: validate against bet state, stake policy, and balance,
    /// then record the wager and debit the balance in one transaction.
    pub async fn place_wager(
        &self,
        user_id: i64,
        bet_id: i64,
        outcome_id: i64,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<Wager, BetError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(BetError::from)?;

        let bet = load_bet(&tx, bet_id)?.ok_or(BetError::NotFound("Bet not found"))?;
        if !bet.is_open(now) {
            return Err(BetError::InvalidState("Bet is no longer accepting wagers"));
        }
        if bet.outcome(outcome_id).is_none() {
            return Err(BetError::NotFound("Outcome not found"));
        }
        if amount < self.minimum_wager {
            return Err(BetError::InvalidArgument(format!(
                "Minimum wager is {} OfficeCoins",
                self.minimum_wager
            )));
        }

        let balance: i64 = tx
            .query_row(
                "SELECT balance FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(BetError::NotFound("User not found"))?;
        if balance < amount {
            return Err(BetError::InsufficientFunds);
        }

        // The weight is locked in here and never recomputed.
        let weight = odds::weight_for(&bet, now, self.early_bet_bonus);

        tx.execute(
            "INSERT INTO wagers (user_id, outcome_id, amount, weight, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, outcome_id, amount, weight, now.to_rfc3339()],
        )?;
        let wager_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE users SET balance = balance - ?1 WHERE id = ?2",
            params![amount, user_id],
        )?;

        tx.commit().map_err(BetError::from)?;
        info!(
            wager_id,
            user_id, bet_id, outcome_id, amount, weight, "Wager placed"
        );

        Ok(Wager {
            id: wager_id,
            user_id,
            outcome_id,
            amount,
            weight,
            payout: None,
            created_at: now,
        })
    }

    /// Resolve a bet: distribute the total pool to winning wagers in
    /// proportion to weighted stake, zero losing wagers, credit balances,
    /// and mark the bet resolved. All-or-nothing.
    pub async fn resolve_bet(
        &self,
        bet_id: i64,
        winning_outcome_id: i64,
        resolver_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Bet, BetError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(BetError::from)?;

        // Sweep first so a past-close bet is resolved from Closed, not Open.
        tx.execute(SWEEP_SQL, params![now.to_rfc3339()])?;

        let bet = load_bet(&tx, bet_id)?.ok_or(BetError::NotFound("Bet not found"))?;
        if bet.creator_id != resolver_id {
            return Err(BetError::Forbidden(
                "Only the bet creator can resolve this bet",
            ));
        }
        if bet.status == BetStatus::Resolved {
            return Err(BetError::InvalidState("Bet has already been resolved"));
        }
        let winning = bet
            .outcome(winning_outcome_id)
            .ok_or_else(|| BetError::InvalidArgument("Invalid winning outcome".to_string()))?;

        let total_pool = bet.total_pool() as f64;
        let winning_weighted = winning.weighted_total();

        // Floor-rounded per wager, independently; the rounding residue is
        // intentionally retained rather than redistributed.
        if winning_weighted > 0.0 {
            for wager in &winning.wagers {
                let payout =
                    ((wager.weighted_amount() / winning_weighted) * total_pool).floor() as i64;
                tx.execute(
                    "UPDATE wagers SET payout = ?1 WHERE id = ?2",
                    params![payout, wager.id],
                )?;
                tx.execute(
                    "UPDATE users SET balance = balance + ?1 WHERE id = ?2",
                    params![payout, wager.user_id],
                )?;
            }
        }

        tx.execute(
            "UPDATE wagers SET payout = 0
             WHERE outcome_id IN (SELECT id FROM outcomes WHERE bet_id = ?1 AND id != ?2)",
            params![bet_id, winning_outcome_id],
        )?;

        tx.execute(
            "UPDATE bets SET status = 'resolved', winning_outcome_id = ?1 WHERE id = ?2",
            params![winning_outcome_id, bet_id],
        )?;

        tx.commit().map_err(BetError::from)?;
        info!(bet_id, winning_outcome_id, resolver_id, "Bet resolved");

        load_bet(&conn, bet_id)?.ok_or(BetError::NotFound("Bet not found"))
    }

    /// Load one wager joined with its outcome and bet.
    pub async fn get_wager_view(&self, wager_id: i64) -> Result<WagerView, BetError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT w.id, w.outcome_id, o.name, o.bet_id, b.title, w.amount, w.weight,
                    w.payout, w.created_at
             FROM wagers w
             JOIN outcomes o ON o.id = w.outcome_id
             JOIN bets b ON b.id = o.bet_id
             WHERE w.id = ?1",
            params![wager_id],
            map_wager_view,
        )
        .optional()?
        .ok_or(BetError::NotFound("Wager not found"))
    }

    /// Wager history for a user, newest first.
    pub async fn list_wagers_for_user(&self, user_id: i64) -> Result<Vec<WagerView>, BetError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT w.id, w.outcome_id, o.name, o.bet_id, b.title, w.amount, w.weight,
                    w.payout, w.created_at
             FROM wagers w
             JOIN outcomes o ON o.id = w.outcome_id
             JOIN bets b ON b.id = o.bet_id
             WHERE w.user_id = ?1
             ORDER BY w.created_at DESC, w.id DESC",
        )?;
        let views = stmt
            .query_map(params![user_id], map_wager_view)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(views)
    }
}

fn map_wager_view(row: &rusqlite::Row) -> rusqlite::Result<WagerView> {
    Ok(WagerView {
        id: row.get(0)?,
        outcome_id: row.get(1)?,
        outcome_name: row.get(2)?,
        bet_id: row.get(3)?,
        bet_title: row.get(4)?,
        amount: row.get(5)?,
        weight: row.get(6)?,
        payout: row.get(7)?,
        created_at: parse_ts(8, row.get(8)?)?,
    })
}

fn load_bet(conn: &Connection, bet_id: i64) -> Result<Option<Bet>, BetError> {
    let bet = conn
        .query_row(
            "SELECT b.id, b.creator_id, u.username, b.title, b.description, b.close_time,
                    b.status, b.winning_outcome_id, b.created_at
             FROM bets b
             JOIN users u ON u.id = b.creator_id
             WHERE b.id = ?1",
            params![bet_id],
            |row| {
                Ok(Bet {
                    id: row.get(0)?,
                    creator_id: row.get(1)?,
                    creator_username: row.get(2)?,
                    title: row.get(3)?,
                    description: row.get(4)?,
                    close_time: parse_ts(5, row.get(5)?)?,
                    status: parse_status(6, row.get(6)?)?,
                    winning_outcome_id: row.get(7)?,
                    created_at: parse_ts(8, row.get(8)?)?,
                    outcomes: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut bet) = bet else {
        return Ok(None);
    };
    bet.outcomes = load_outcomes(conn, bet.id)?;
    Ok(Some(bet))
}

fn load_outcomes(conn: &Connection, bet_id: i64) -> Result<Vec<Outcome>, BetError> {
    let mut stmt =
        conn.prepare("SELECT id, bet_id, name FROM outcomes WHERE bet_id = ?1 ORDER BY id")?;
    let mut outcomes = stmt
        .query_map(params![bet_id], |row| {
            Ok(Outcome {
                id: row.get(0)?,
                bet_id: row.get(1)?,
                name: row.get(2)?,
                wagers: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut wager_stmt = conn.prepare(
        "SELECT id, user_id, outcome_id, amount, weight, payout, created_at
         FROM wagers WHERE outcome_id = ?1 ORDER BY id",
    )?;
    for outcome in &mut outcomes {
        outcome.wagers = wager_stmt
            .query_map(params![outcome.id], |row| {
                Ok(Wager {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    outcome_id: row.get(2)?,
                    amount: row.get(3)?,
                    weight: row.get(4)?,
                    payout: row.get(5)?,
                    created_at: parse_ts(6, row.get(6)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
    }

    Ok(outcomes)
}

fn parse_status(idx: usize, s: String) -> rusqlite::Result<BetStatus> {
    // A corrupt status must surface, not default to Open: that could let a
    // settled bet accept wagers again.
    BetStatus::from_str(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown bet status: {}", s).into(),
        )
    })
}

fn parse_ts(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
