//! User Storage
//! Mission: Securely store and manage user accounts with SQLite

use crate::auth::models::User;
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::time::Duration;
use tracing::info;

/// User storage with SQLite backend.
///
/// Opens a fresh connection per call; balances are only mutated through the
/// betting store's transactions, this side reads them.
pub struct UserStore {
    db_path: String,
    initial_balance: i64,
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str, initial_balance: i64) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
            initial_balance,
        };
        store.init_db()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).context("Failed to open user database")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        let conn = self.open()?;

        // Schema shared with betting::BetStore; both CREATE statements must
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

        Ok(())
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let created_at: String = row.get(4)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?
            .with_timezone(&Utc);

        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            balance: row.get(3)?,
            created_at,
        })
    }

    /// Create a new user with the configured starting balance
    pub fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;
        let created_at = Utc::now();

        let conn = self.open()?;
        conn.execute(
            "INSERT INTO users (username, password_hash, balance, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                username,
                password_hash,
                self.initial_balance,
                created_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert user")?;

        let id = conn.last_insert_rowid();

        info!("Created user: {} (id {})", username, id);

        Ok(User {
            id,
            username: username.to_string(),
            password_hash,
            balance: self.initial_balance,
            created_at,
        })
    }

    /// Get user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.open()?;

        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, balance, created_at
             FROM users WHERE username = ?1",
        )?;

        let user_result = stmt.query_row(params![username], Self::row_to_user);

        match user_result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get user by id
    pub fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.open()?;

        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, balance, created_at
             FROM users WHERE id = ?1",
        )?;

        let user_result = stmt.query_row(params![user_id], Self::row_to_user);

        match user_result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify username and password
    pub fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        match self.get_user_by_username(username)? {
            Some(user) => {
                let valid =
                    verify(password, &user.password_hash).context("Failed to verify password")?;
                Ok(valid)
            }
            None => Ok(false),
        }
    }

    /// Top users by balance, ties broken by username
    pub fn leaderboard(&self, limit: u32) -> Result<Vec<(String, i64)>> {
        let conn = self.open()?;

        let mut stmt = conn.prepare(
            "SELECT username, balance FROM users
             ORDER BY balance DESC, username ASC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

/// Whether an error is SQLite's UNIQUE constraint firing, as opposed to an
/// I/O or hashing failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (UserStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = UserStore::new(db_path, 1000).unwrap();
        (store, temp_file)
    }

    #[test]
    fn test_create_and_retrieve_user() {
        let (store, _temp) = create_test_store();

        let user = store.create_user("alice", "password123").unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.balance, 1000);

        let retrieved = store.get_user_by_username("alice").unwrap();
        assert!(retrieved.is_some());

        let retrieved = retrieved.unwrap();
        assert_eq!(retrieved.id, user.id);
        assert_eq!(retrieved.balance, 1000);

        let by_id = store.get_user_by_id(user.id).unwrap();
        assert_eq!(by_id.unwrap().username, "alice");
    }

    #[test]
    fn test_missing_user_is_none() {
        let (store, _temp) = create_test_store();

        assert!(store.get_user_by_username("nonexistent").unwrap().is_none());
        assert!(store.get_user_by_id(999).unwrap().is_none());
    }

    #[test]
    fn test_password_verification() {
        let (store, _temp) = create_test_store();
        store.create_user("alice", "password123").unwrap();

        // Correct password
        assert!(store.verify_password("alice", "password123").unwrap());

        // Incorrect password
        assert!(!store.verify_password("alice", "wrongpassword").unwrap());

        // Non-existent user
        assert!(!store.verify_password("nonexistent", "password").unwrap());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (store, _temp) = create_test_store();

        store.create_user("alice", "password123").unwrap();
        let err = store.create_user("alice", "other-password").unwrap_err();
        assert!(is_unique_violation(&err));

        // Unrelated failures must not classify as a username conflict.
        assert!(!is_unique_violation(&anyhow::anyhow!("disk full")));
    }

    #[test]
    fn test_leaderboard_ordering() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = UserStore::new(db_path, 1000).unwrap();

        let alice = store.create_user("alice", "pass").unwrap();
        store.create_user("bob", "pass").unwrap();
        store.create_user("charlie", "pass").unwrap();

        // Bump alice above the others directly.
        let conn = Connection::open(db_path).unwrap();
        conn.execute(
            "UPDATE users SET balance = 1500 WHERE id = ?1",
            params![alice.id],
        )
        .unwrap();

        let rows = store.leaderboard(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("alice".to_string(), 1500));
        // bob and charlie tie at 1000; username breaks the tie.
        assert_eq!(rows[1], ("bob".to_string(), 1000));
    }
}
