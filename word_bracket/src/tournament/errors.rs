//! Tournament error types.

use super::models::{MatchId, TournamentId, TournamentStatus, UserId};
use crate::db::timeouts::TimeoutError;
use crate::rewards::RewardError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Malformed input or a request the bracket rules do not allow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Bracket size {0} must be a power of two between 2 and 1024")]
    InvalidBracketSize(u32),

    #[error("Too many participants: {count} for a bracket of {max}")]
    TooManyParticipants { count: usize, max: u32 },

    #[error("Participant {0} appears more than once")]
    DuplicateParticipant(UserId),

    #[error("Match {0} is not ready: both players must be seated")]
    MatchNotReady(MatchId),

    #[error("Leg {leg} is not open for player {user_id}")]
    LegNotOpen { user_id: UserId, leg: u8 },

    #[error("Player {0} has already submitted every leg")]
    LegsComplete(UserId),

    #[error("Match {0} is already resolved")]
    MatchResolved(MatchId),

    #[error("Round {round} slot {slot} is already held by player {occupant}")]
    SlotOccupied { round: u32, slot: u32, occupant: UserId },

    #[error("Score and elapsed time must be non-negative")]
    NegativeScore,

    #[error("Leg out of range: score is capped at {max_score}, elapsed time at {max_elapsed_ms} ms")]
    LegOutOfRange { max_score: i64, max_elapsed_ms: i64 },

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Registration window is closed")]
    RegistrationClosed,

    #[error("Tournament is full")]
    TournamentFull,

    #[error("Player {0} is already registered")]
    AlreadyRegistered(UserId),

    #[error("Player {0} is not registered")]
    NotRegistered(UserId),

    #[error("Level {level} is below the required level {min_level}")]
    LevelTooLow { level: u32, min_level: u32 },

    #[error("Unknown user {0}")]
    UnknownUser(UserId),
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Deadline for round {round} of match {match_id} passed at {deadline}")]
    DeadlineExceeded {
        match_id: MatchId,
        round: u32,
        deadline: DateTime<Utc>,
    },

    #[error("User {user_id} is not a player in match {match_id}")]
    NotParticipant { user_id: UserId, match_id: MatchId },

    #[error("Tournament {0} is closed")]
    TournamentClosed(TournamentId),

    #[error("Tournament not in correct state: expected {expected}, got {actual}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    #[error("Insufficient players: need {needed}, have {current}")]
    InsufficientPlayers { needed: usize, current: usize },

    #[error("Concurrent modification of {0}")]
    ConcurrencyConflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Reward error: {0}")]
    Reward(#[from] RewardError),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl TournamentError {
    /// Whether a retry with fresh state may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, TournamentError::ConcurrencyConflict(_))
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_)
            | TournamentError::Timeout(_)
            | TournamentError::Serialization(_)
            | TournamentError::Corrupt(_) => "Internal server error".to_string(),
            TournamentError::Reward(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

impl From<TimeoutError> for TournamentError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => TournamentError::Timeout(duration),
            TimeoutError::Database(e) => TournamentError::Database(e),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_errors_are_sanitized() {
        let err = TournamentError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");

        let err = TournamentError::TournamentClosed(9);
        assert_eq!(err.client_message(), "Tournament 9 is closed");
    }

    #[test]
    fn test_conflict_detection() {
        assert!(TournamentError::ConcurrencyConflict("match".into()).is_conflict());
        assert!(!TournamentError::NotFound(1).is_conflict());
    }

    #[test]
    fn test_validation_converts() {
        let err: TournamentError = ValidationError::TournamentFull.into();
        assert!(matches!(
            err,
            TournamentError::Validation(ValidationError::TournamentFull)
        ));
    }
}
