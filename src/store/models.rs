use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The lifecycle status of a duel.
///
/// A duel starts `Pending` and moves to `Completed` exactly once, in the
/// same transaction that records the winner.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
pub enum DuelStatus {
    #[default]
    Pending,
    Completed,
}

/// A duel header joined with its two participants.
///
/// Serializes to the JSON contract consumed by presentation layers:
/// `id`, `status`, `dateCreated` and a two-element `participants` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Duel {
    pub id: i64,
    pub status: DuelStatus,
    pub date_created: DateTime<Utc>,
    pub participants: Vec<DuelParticipant>,
}

/// A user's membership row in a duel, with the username resolved from the
/// user directory at read time.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelParticipant {
    pub user_id: i64,
    pub username: String,
    pub is_winner: bool,
}

/// A registered user within the database.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub date_joined: DateTime<Utc>,
}

/// A duel header row as stored, before participants are attached.
#[derive(sqlx::FromRow)]
pub(crate) struct DuelRow {
    pub id: i64,
    pub status: DuelStatus,
    pub date_created: DateTime<Utc>,
}

/// One row of the duel-history join, covering a header and one participant.
#[derive(sqlx::FromRow)]
pub(crate) struct DuelHistoryRow {
    pub duel_id: i64,
    pub status: DuelStatus,
    pub date_created: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
    pub is_winner: bool,
}

impl DuelHistoryRow {
    pub(crate) fn participant(&self) -> DuelParticipant {
        DuelParticipant {
            user_id: self.user_id,
            username: self.username.clone(),
            is_winner: self.is_winner,
        }
    }

    pub(crate) fn into_duel(self) -> Duel {
        let participant = self.participant();
        Duel {
            id: self.duel_id,
            status: self.status,
            date_created: self.date_created,
            participants: vec![participant],
        }
    }
}
