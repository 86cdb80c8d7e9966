//! Integration test for the full betting lifecycle
//!
//! Drives registration, bet creation, wager placement, expiry, and
//! resolution through the public library API against one SQLite file,
//! the same way the server binary wires the stores together.

use chrono::{Duration, Utc};
use officebook_backend::auth::UserStore;
use officebook_backend::betting::{BetStatus, BetStore};
use tempfile::NamedTempFile;

const INITIAL_BALANCE: i64 = 1000;
const MINIMUM_WAGER: i64 = 50;
const EARLY_BET_BONUS: f64 = 1.2;

fn open_stores(db_path: &str) -> (UserStore, BetStore) {
    let users = UserStore::new(db_path, INITIAL_BALANCE).unwrap();
    let bets = BetStore::new(db_path, MINIMUM_WAGER, EARLY_BET_BONUS).unwrap();
    (users, bets)
}

#[tokio::test]
async fn full_lifecycle_settles_balances() {
    let temp = NamedTempFile::new().unwrap();
    let db_path = temp.path().to_str().unwrap();
    let (users, bets) = open_stores(db_path);

    let alice = users.create_user("alice", "password123").unwrap();
    let bob = users.create_user("bob", "password123").unwrap();
    let charlie = users.create_user("charlie", "password123").unwrap();

    let created = Utc::now();
    let close_time = created + Duration::hours(2);
    let bet_id = bets
        .create_bet(
            alice.id,
            "Will the deploy succeed on first try?",
            "No rollback within an hour counts as success.",
            &["Yes".to_string(), "No".to_string()],
            close_time,
            created,
        )
        .await
        .unwrap();

    let bet = bets.get_bet(bet_id).await.unwrap();
    let yes = bet.outcomes[0].id;
    let no = bet.outcomes[1].id;

    // Alice bets early and earns the bonus weight; the others bet after
    // the midpoint at weight 1.0.
    let early = created + Duration::minutes(10);
    let late = created + Duration::minutes(90);
    bets.place_wager(alice.id, bet_id, yes, 100, early)
        .await
        .unwrap();
    bets.place_wager(bob.id, bet_id, yes, 100, late)
        .await
        .unwrap();
    bets.place_wager(charlie.id, bet_id, no, 200, late)
        .await
        .unwrap();

    // Stakes are debited immediately.
    assert_eq!(users.get_user_by_id(alice.id).unwrap().unwrap().balance, 900);
    assert_eq!(users.get_user_by_id(bob.id).unwrap().unwrap().balance, 900);
    assert_eq!(
        users.get_user_by_id(charlie.id).unwrap().unwrap().balance,
        800
    );

    // Creator resolves after close: Yes wins. Pool 400, winning weighted
    // total 220, so floor payouts are 218 (alice) and 181 (bob).
    let after_close = close_time + Duration::minutes(5);
    let resolved = bets
        .resolve_bet(bet_id, yes, alice.id, after_close)
        .await
        .unwrap();
    assert_eq!(resolved.status, BetStatus::Resolved);
    assert_eq!(resolved.winning_outcome_id, Some(yes));

    assert_eq!(
        users.get_user_by_id(alice.id).unwrap().unwrap().balance,
        900 + 218
    );
    assert_eq!(
        users.get_user_by_id(bob.id).unwrap().unwrap().balance,
        900 + 181
    );
    assert_eq!(
        users.get_user_by_id(charlie.id).unwrap().unwrap().balance,
        800
    );

    // One coin of the pool is retained by flooring.
    let total_paid: i64 = 218 + 181;
    assert!(total_paid < 400);

    // Wager history carries the settled payouts.
    let history = bets.list_wagers_for_user(charlie.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].payout, Some(0));
}

#[tokio::test]
async fn expired_bets_close_and_reject_wagers() {
    let temp = NamedTempFile::new().unwrap();
    let db_path = temp.path().to_str().unwrap();
    let (users, bets) = open_stores(db_path);

    let alice = users.create_user("alice", "password123").unwrap();
    let bob = users.create_user("bob", "password123").unwrap();

    let created = Utc::now();
    let bet_id = bets
        .create_bet(
            alice.id,
            "Will it rain tomorrow?",
            "",
            &["Yes".to_string(), "No".to_string()],
            created + Duration::hours(1),
            created,
        )
        .await
        .unwrap();

    let after_close = created + Duration::hours(2);
    let closed = bets.close_expired_bets(after_close).await.unwrap();
    assert_eq!(closed, 1);

    let bet = bets.get_bet(bet_id).await.unwrap();
    assert_eq!(bet.status, BetStatus::Closed);

    // Closed bets reject new wagers; the balance stays untouched.
    let outcome = bet.outcomes[0].id;
    let err = bets
        .place_wager(bob.id, bet_id, outcome, 100, after_close)
        .await;
    assert!(err.is_err());
    assert_eq!(
        users.get_user_by_id(bob.id).unwrap().unwrap().balance,
        INITIAL_BALANCE
    );

    // The creator can still resolve a closed bet.
    let resolved = bets
        .resolve_bet(bet_id, outcome, alice.id, after_close)
        .await
        .unwrap();
    assert_eq!(resolved.status, BetStatus::Resolved);
}
