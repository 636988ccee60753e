use tracing::debug;

use crate::error::{ServiceError, StoreError};
use crate::store::models::{Duel, DuelParticipant};
use crate::store::DuelStore;

/// Business-rule gate in front of a [`DuelStore`].
///
/// Validates requests before any storage work happens and translates every
/// store failure into one of the three [`ServiceError`] kinds. Nothing
/// here retries: a request either fully succeeds or fails with a typed
/// reason.
pub struct DuelService<S> {
    store: S,
}

impl<S> DuelService<S>
where
    S: DuelStore<Error = StoreError>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_duel_by_id(&self, duel_id: i64) -> Result<Duel, ServiceError> {
        self.store
            .get_duel_by_id(duel_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    ServiceError::NotFound(format!("duel {} not found", duel_id))
                }
                other => ServiceError::Internal(other),
            })
    }

    pub async fn get_duels_by_user_id(&self, user_id: i64) -> Result<Vec<Duel>, ServiceError> {
        self.store
            .get_duels_by_user_id(user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    ServiceError::NotFound(format!("no duels found for user {}", user_id))
                }
                other => ServiceError::Internal(other),
            })
    }

    pub async fn get_participants_by_duel_id(
        &self,
        duel_id: i64,
    ) -> Result<Vec<DuelParticipant>, ServiceError> {
        self.store
            .get_participants_by_duel_id(duel_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    ServiceError::NotFound(format!("participants of duel {} not found", duel_id))
                }
                other => ServiceError::Internal(other),
            })
    }

    /// Creates a duel between two distinct users and returns its id.
    ///
    /// The self-duel check runs strictly before any store call, so an
    /// invalid request never opens a transaction.
    pub async fn create_duel(&self, user_id_1: i64, user_id_2: i64) -> Result<i64, ServiceError> {
        if user_id_1 == user_id_2 {
            debug!("rejected self-duel request from user {}", user_id_1);
            return Err(ServiceError::Validation(
                "a user cannot duel themselves".to_string(),
            ));
        }

        self.store
            .create_duel(user_id_1, user_id_2)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(msg) => ServiceError::NotFound(msg),
                other => ServiceError::Internal(other),
            })
    }

    /// Resolves a pending duel in favor of `winner_user_id`.
    pub async fn assign_winner(
        &self,
        duel_id: i64,
        winner_user_id: i64,
    ) -> Result<(), ServiceError> {
        self.store
            .assign_winner(duel_id, winner_user_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => ServiceError::NotFound(format!(
                    "user {} is not a participant of duel {}",
                    winner_user_id, duel_id
                )),
                StoreError::AlreadyCompleted(id) => {
                    ServiceError::Validation(format!("duel {} is already completed", id))
                }
                other => ServiceError::Internal(other),
            })
    }
}
