use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::StoreError;
use models::{Duel, DuelHistoryRow, DuelParticipant, DuelRow, DuelStatus, User};

/// Models for the database.
///
/// These models are specific to the current database design and schema.
/// Most if not all are directly mapped to a table in the database.
pub mod models;

#[cfg(test)]
mod tests;

/// The SQLite-backed store for duels and the user directory.
///
/// Connections are pooled; each operation acquires one for its own
/// duration, and multi-statement writes hold a transaction that commits
/// explicitly or rolls back when the handle is dropped on an early return.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pub pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database described by `config`, creating the file if it
    /// does not exist yet. Foreign keys are enforced on every connection.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!("successfully connected to the arena database");

        Ok(SqliteStore { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Storage operations for duels and their participants.
///
/// Note that changing the implementation of this trait will only allow you
/// to change which database backs the duel tables; the schema contract
/// (one duel row owning exactly two participant rows) stays the same.
pub trait DuelStore {
    type Error;

    /// Retrieves a duel header together with its full participant list.
    async fn get_duel_by_id(&self, duel_id: i64) -> Result<Duel, Self::Error>;

    /// Retrieves every duel the user takes part in, most recent first,
    /// each with both participants attached.
    async fn get_duels_by_user_id(&self, user_id: i64) -> Result<Vec<Duel>, Self::Error>;

    /// Retrieves the participant rows of a duel with usernames resolved.
    async fn get_participants_by_duel_id(
        &self,
        duel_id: i64,
    ) -> Result<Vec<DuelParticipant>, Self::Error>;

    /// Creates a pending duel between two users, returning the duel id.
    async fn create_duel(&self, user_id_1: i64, user_id_2: i64) -> Result<i64, Self::Error>;

    /// Marks one participant as the winner and completes the duel.
    async fn assign_winner(&self, duel_id: i64, winner_user_id: i64) -> Result<(), Self::Error>;
}

impl DuelStore for SqliteStore {
    type Error = StoreError;

    async fn get_duel_by_id(&self, duel_id: i64) -> Result<Duel, Self::Error> {
        let header = sqlx::query_as::<_, DuelRow>(
            r#"
            SELECT id, status, date_created
            FROM duels
            WHERE id = ?
            "#,
        )
        .bind(duel_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("duel {} does not exist", duel_id)))?;

        let participants = self.get_participants_by_duel_id(duel_id).await?;

        Ok(Duel {
            id: header.id,
            status: header.status,
            date_created: header.date_created,
            participants,
        })
    }

    async fn get_duels_by_user_id(&self, user_id: i64) -> Result<Vec<Duel>, Self::Error> {
        let rows = sqlx::query_as::<_, DuelHistoryRow>(
            r#"
            SELECT
                d.id AS duel_id,
                d.status,
                d.date_created,
                dp.user_id,
                u.username,
                dp.is_winner
            FROM duel_participants AS dp
            INNER JOIN duels AS d ON dp.duel_id = d.id
            INNER JOIN users AS u ON u.id = dp.user_id
            WHERE d.id IN (
                SELECT duel_id
                FROM duel_participants
                WHERE user_id = ?
            )
            ORDER BY d.date_created DESC, d.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        // Rows of the same duel are adjacent thanks to the id tie-breaker.
        let mut duels: Vec<Duel> = Vec::new();
        for row in rows {
            if let Some(duel) = duels.last_mut() {
                if duel.id == row.duel_id {
                    duel.participants.push(row.participant());
                    continue;
                }
            }
            duels.push(row.into_duel());
        }

        Ok(duels)
    }

    async fn get_participants_by_duel_id(
        &self,
        duel_id: i64,
    ) -> Result<Vec<DuelParticipant>, Self::Error> {
        let participants = sqlx::query_as::<_, DuelParticipant>(
            r#"
            SELECT dp.user_id, u.username, dp.is_winner
            FROM duel_participants AS dp
            INNER JOIN users AS u ON dp.user_id = u.id
            WHERE dp.duel_id = ?
            "#,
        )
        .bind(duel_id)
        .fetch_all(&self.pool)
        .await?;

        if participants.is_empty() {
            return Err(StoreError::NotFound(format!(
                "no participants found for duel {}",
                duel_id
            )));
        }

        Ok(participants)
    }

    async fn create_duel(&self, user_id_1: i64, user_id_2: i64) -> Result<i64, Self::Error> {
        debug!(
            "creating duel between users {} and {}",
            user_id_1, user_id_2
        );
        let mut tx = self.pool.begin().await?;

        let duel_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO duels (status, date_created)
            VALUES (?, ?)
            RETURNING id
            "#,
        )
        .bind(DuelStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for user_id in [user_id_1, user_id_2] {
            sqlx::query(
                r#"
                INSERT INTO duel_participants (duel_id, user_id, is_winner)
                VALUES (?, ?, FALSE)
                "#,
            )
            .bind(duel_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            "created duel {} between users {} and {}",
            duel_id, user_id_1, user_id_2
        );

        Ok(duel_id)
    }

    async fn assign_winner(&self, duel_id: i64, winner_user_id: i64) -> Result<(), Self::Error> {
        debug!("assigning user {} as winner of duel {}", winner_user_id, duel_id);
        let mut tx = self.pool.begin().await?;

        let is_participant = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM duel_participants
            WHERE duel_id = ? AND user_id = ?
            "#,
        )
        .bind(duel_id)
        .bind(winner_user_id)
        .fetch_one(&mut *tx)
        .await?;
        if is_participant == 0 {
            // Dropping the transaction handle rolls it back.
            return Err(StoreError::NotFound(format!(
                "user {} is not a participant of duel {}",
                winner_user_id, duel_id
            )));
        }

        // The conditional update doubles as the completed-duel guard: zero
        // affected rows here means the duel was resolved earlier, since the
        // participant check already proved the duel exists.
        let completed = sqlx::query(
            r#"
            UPDATE duels
            SET status = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(DuelStatus::Completed)
        .bind(duel_id)
        .bind(DuelStatus::Pending)
        .execute(&mut *tx)
        .await?;
        if completed.rows_affected() == 0 {
            return Err(StoreError::AlreadyCompleted(duel_id));
        }

        sqlx::query(
            r#"
            UPDATE duel_participants
            SET is_winner = CASE WHEN user_id = ? THEN TRUE ELSE FALSE END
            WHERE duel_id = ?
            "#,
        )
        .bind(winner_user_id)
        .bind(duel_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("user {} won duel {}", winner_user_id, duel_id);

        Ok(())
    }
}

/// Lookup capabilities of the user directory consumed by the duel core.
///
/// Duel operations resolve usernames through joins against the same
/// `users` table, so the directory lives behind its own trait on the same
/// store.
pub trait UserDirectory {
    type Error;

    /// Registers a user, returning the assigned id.
    async fn create_user(&self, username: &str) -> Result<i64, Self::Error>;

    /// Retrieves a user from the database with a given username.
    async fn get_user_by_username(&self, username: &str) -> Result<User, Self::Error>;

    async fn user_exists(&self, user_id: i64) -> Result<bool, Self::Error>;

    async fn username_of(&self, user_id: i64) -> Result<String, Self::Error>;
}

impl UserDirectory for SqliteStore {
    type Error = StoreError;

    async fn create_user(&self, username: &str) -> Result<i64, Self::Error> {
        let user_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (username, date_joined)
            VALUES (?, ?)
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        info!("registered user {} with id {}", username, user_id);

        Ok(user_id)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, Self::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, date_joined
            FROM users
            WHERE username = ?
            LIMIT 1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {} does not exist", username)))
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, Self::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn username_of(&self, user_id: i64) -> Result<String, Self::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT username
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {} does not exist", user_id)))
    }
}
