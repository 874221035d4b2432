//! Challenge error types.

use super::models::ChallengeId;
use crate::db::timeouts::TimeoutError;
use crate::tournament::errors::{TournamentError, ValidationError};
use crate::tournament::models::UserId;
use thiserror::Error;

/// Challenge errors
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Challenge not found: {0}")]
    NotFound(ChallengeId),

    #[error("Challenge {0} has expired")]
    Expired(ChallengeId),

    #[error("Challenge {0} is already completed")]
    AlreadyCompleted(ChallengeId),

    #[error("Cannot join your own challenge")]
    SelfJoin,

    #[error("User {user_id} is not the target of challenge {challenge_id}")]
    NotTarget {
        challenge_id: ChallengeId,
        user_id: UserId,
    },

    #[error("Concurrent modification of challenge {0}")]
    ConcurrencyConflict(ChallengeId),

    #[error(transparent)]
    Tournament(#[from] TournamentError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl ChallengeError {
    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            ChallengeError::Database(_) | ChallengeError::Timeout(_) | ChallengeError::Corrupt(_) => {
                "Internal server error".to_string()
            }
            ChallengeError::Tournament(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

impl From<TimeoutError> for ChallengeError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => ChallengeError::Timeout(duration),
            TimeoutError::Database(e) => ChallengeError::Database(e),
        }
    }
}

/// Result type for challenge operations
pub type ChallengeResult<T> = Result<T, ChallengeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_tournament_errors_keep_their_message() {
        let err: ChallengeError = TournamentError::TournamentClosed(4).into();
        assert_eq!(err.client_message(), "Tournament 4 is closed");

        let err: ChallengeError = TournamentError::Database(sqlx::Error::PoolClosed).into();
        assert_eq!(err.client_message(), "Internal server error");
    }
}
