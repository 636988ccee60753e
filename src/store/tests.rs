use sqlx::SqlitePool;

use super::models::DuelStatus;
use super::{DuelStore, SqliteStore, UserDirectory};
use crate::config::StoreConfig;
use crate::error::{ServiceError, StoreError};
use crate::service::DuelService;

async fn seed_players(store: &SqliteStore) -> (i64, i64) {
    let april = store.create_user("april").await.unwrap();
    let benny = store.create_user("benny").await.unwrap();
    (april, benny)
}

async fn count_rows(store: &SqliteStore, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    sqlx::query_scalar(&sql)
        .fetch_one(&store.pool)
        .await
        .unwrap()
}

#[sqlx::test]
async fn create_duel_starts_pending_with_two_participants(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, benny) = seed_players(&store).await;

    let duel_id = store.create_duel(april, benny).await.unwrap();
    let duel = store.get_duel_by_id(duel_id).await.unwrap();

    assert_eq!(duel.id, duel_id);
    assert_eq!(duel.status, DuelStatus::Pending);
    assert_eq!(duel.participants.len(), 2);
    let mut user_ids: Vec<i64> = duel.participants.iter().map(|p| p.user_id).collect();
    user_ids.sort();
    assert_eq!(user_ids, vec![april, benny]);
    assert!(duel.participants.iter().all(|p| !p.is_winner));
}

#[sqlx::test]
async fn participants_resolve_usernames_from_the_directory(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, benny) = seed_players(&store).await;
    let duel_id = store.create_duel(april, benny).await.unwrap();

    let participants = store.get_participants_by_duel_id(duel_id).await.unwrap();

    let mut usernames: Vec<&str> = participants.iter().map(|p| p.username.as_str()).collect();
    usernames.sort();
    assert_eq!(usernames, vec!["april", "benny"]);
}

#[sqlx::test]
async fn assign_winner_completes_the_duel_atomically(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, benny) = seed_players(&store).await;
    let duel_id = store.create_duel(april, benny).await.unwrap();

    store.assign_winner(duel_id, april).await.unwrap();

    let duel = store.get_duel_by_id(duel_id).await.unwrap();
    assert_eq!(duel.status, DuelStatus::Completed);
    for participant in &duel.participants {
        assert_eq!(participant.is_winner, participant.user_id == april);
    }
}

#[sqlx::test]
async fn assign_winner_rejects_an_already_completed_duel(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, benny) = seed_players(&store).await;
    let duel_id = store.create_duel(april, benny).await.unwrap();
    store.assign_winner(duel_id, april).await.unwrap();

    let err = store.assign_winner(duel_id, benny).await.unwrap_err();

    assert!(matches!(err, StoreError::AlreadyCompleted(id) if id == duel_id));
    // The losing rematch attempt must not flip any flag: still exactly one
    // winner, and it is still april.
    let duel = store.get_duel_by_id(duel_id).await.unwrap();
    let winners: Vec<i64> = duel
        .participants
        .iter()
        .filter(|p| p.is_winner)
        .map(|p| p.user_id)
        .collect();
    assert_eq!(winners, vec![april]);
}

#[sqlx::test]
async fn assign_winner_rejects_a_non_participant_without_mutation(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, benny) = seed_players(&store).await;
    let cleo = store.create_user("cleo").await.unwrap();
    let duel_id = store.create_duel(april, benny).await.unwrap();

    let err = store.assign_winner(duel_id, cleo).await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)));
    let duel = store.get_duel_by_id(duel_id).await.unwrap();
    assert_eq!(duel.status, DuelStatus::Pending);
    assert!(duel.participants.iter().all(|p| !p.is_winner));
}

#[sqlx::test]
async fn assign_winner_on_a_missing_duel_is_not_found(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, _) = seed_players(&store).await;

    let err = store.assign_winner(999, april).await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)));
}

#[sqlx::test]
async fn get_duel_by_id_on_a_missing_duel_is_not_found(pool: SqlitePool) {
    let store = SqliteStore { pool };

    let err = store.get_duel_by_id(999).await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)));
}

#[sqlx::test]
async fn get_participants_on_a_missing_duel_is_not_found(pool: SqlitePool) {
    let store = SqliteStore { pool };

    let err = store.get_participants_by_duel_id(999).await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)));
}

#[sqlx::test]
async fn a_user_without_duels_has_an_empty_history(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, _) = seed_players(&store).await;

    let duels = store.get_duels_by_user_id(april).await.unwrap();

    assert!(duels.is_empty());
}

#[sqlx::test]
async fn history_lists_the_most_recent_duel_first(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, benny) = seed_players(&store).await;
    let cleo = store.create_user("cleo").await.unwrap();
    let first = store.create_duel(april, benny).await.unwrap();
    let second = store.create_duel(april, cleo).await.unwrap();

    let duels = store.get_duels_by_user_id(april).await.unwrap();

    assert_eq!(duels.len(), 2);
    assert_eq!(duels[0].id, second);
    assert_eq!(duels[1].id, first);
    assert!(duels.iter().all(|d| d.participants.len() == 2));

    // Benny only ever played the first duel.
    let duels = store.get_duels_by_user_id(benny).await.unwrap();
    assert_eq!(duels.len(), 1);
    assert_eq!(duels[0].id, first);
}

#[sqlx::test]
async fn create_duel_rolls_back_on_a_duplicate_participant(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, _) = seed_players(&store).await;

    // The store trusts the service to reject self-duels; handed one anyway,
    // the composite primary key fails the second insert mid-transaction.
    let err = store.create_duel(april, april).await.unwrap_err();

    assert!(matches!(err, StoreError::Query(_)));
    assert_eq!(count_rows(&store, "duels").await, 0);
    assert_eq!(count_rows(&store, "duel_participants").await, 0);
}

#[tokio::test]
async fn create_duel_rolls_back_when_a_participant_insert_fails() {
    let mut config = StoreConfig::new("sqlite::memory:");
    config.max_connections = 1;
    let store = SqliteStore::connect(&config).await.unwrap();
    store.migrate().await.unwrap();

    // No users registered: the first participant insert violates the
    // foreign key after the duel header was already written.
    let err = store.create_duel(123, 456).await.unwrap_err();

    assert!(matches!(err, StoreError::Query(_)));
    assert_eq!(count_rows(&store, "duels").await, 0);
    assert_eq!(count_rows(&store, "duel_participants").await, 0);
}

#[sqlx::test]
async fn duplicate_usernames_are_rejected(pool: SqlitePool) {
    let store = SqliteStore { pool };
    store.create_user("april").await.unwrap();

    let err = store.create_user("april").await.unwrap_err();

    assert!(matches!(err, StoreError::Query(_)));
}

#[sqlx::test]
async fn user_directory_lookups(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let april = store.create_user("april").await.unwrap();

    assert!(store.user_exists(april).await.unwrap());
    assert!(!store.user_exists(april + 1).await.unwrap());
    assert_eq!(store.username_of(april).await.unwrap(), "april");
    assert!(matches!(
        store.username_of(999).await.unwrap_err(),
        StoreError::NotFound(_)
    ));

    let user = store.get_user_by_username("april").await.unwrap();
    assert_eq!(user.id, april);
    assert!(matches!(
        store.get_user_by_username("zoe").await.unwrap_err(),
        StoreError::NotFound(_)
    ));
}

#[sqlx::test]
async fn the_service_resolves_a_duel_end_to_end(pool: SqlitePool) {
    let store = SqliteStore { pool };
    let (april, benny) = seed_players(&store).await;
    let service = DuelService::new(store.clone());

    let duel_id = service.create_duel(april, benny).await.unwrap();
    service.assign_winner(duel_id, april).await.unwrap();

    let duel = service.get_duel_by_id(duel_id).await.unwrap();
    assert_eq!(duel.status, DuelStatus::Completed);
    for participant in &duel.participants {
        assert_eq!(participant.is_winner, participant.user_id == april);
    }

    let err = service.assign_winner(duel_id, benny).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}
