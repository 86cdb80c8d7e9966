//! Seed Binary
//! Mission: Load demo users and sample bets into a fresh database

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use dotenv::dotenv;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use officebook_backend::{
    auth::UserStore,
    betting::BetStore,
    config::Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "officebook_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    let users = UserStore::new(&config.db_path, config.initial_balance)
        .context("Failed to initialize user store")?;
    let bets = BetStore::new(&config.db_path, config.minimum_wager, config.early_bet_bonus)
        .context("Failed to initialize bet store")?;

    // Idempotent: a seeded database is left alone.
    if users.get_user_by_username("alice")?.is_some() {
        info!("Database already seeded, skipping");
        return Ok(());
    }

    let alice = users.create_user("alice", "password123")?;
    let bob = users.create_user("bob", "password123")?;
    let charlie = users.create_user("charlie", "password123")?;
    users.create_user("demo", "demo")?;
    info!("Created 4 users");

    let now = Utc::now();

    let sample_bets: [(i64, &str, &str, Vec<String>, chrono::DateTime<Utc>); 4] = [
        (
            alice.id,
            "Will it rain tomorrow?",
            "Based on the weather forecast for our city. Resolution based on \
             whether any measurable precipitation falls.",
            vec!["Yes".to_string(), "No".to_string()],
            now + Duration::hours(24),
        ),
        (
            bob.id,
            "Who wins the ping pong tournament?",
            "Office ping pong tournament this Friday. Single elimination bracket.",
            vec![
                "Alice".to_string(),
                "Bob".to_string(),
                "Charlie".to_string(),
            ],
            now + Duration::days(3),
        ),
        (
            charlie.id,
            "Will the deploy succeed on first try?",
            "Today's production deployment. Success means no rollback needed \
             within 1 hour.",
            vec!["Yes".to_string(), "No".to_string()],
            now + Duration::hours(2),
        ),
        (
            alice.id,
            "How many bugs in the next sprint?",
            "Count of bug tickets created during the next two-week sprint.",
            vec![
                "0-5".to_string(),
                "6-10".to_string(),
                "11-20".to_string(),
                "More than 20".to_string(),
            ],
            now + Duration::days(14),
        ),
    ];

    for (creator_id, title, description, outcomes, close_time) in sample_bets {
        bets.create_bet(creator_id, title, description, &outcomes, close_time, now)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed bet {:?}: {:?}", title, e))?;
    }

    info!("Created 4 sample bets");
    info!("Database seeded successfully");

    Ok(())
}
