//! Reward error types.

use crate::db::timeouts::TimeoutError;
use crate::tournament::models::UserId;
use thiserror::Error;

/// Reward errors
#[derive(Debug, Error)]
pub enum RewardError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database call exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Profile not found
    #[error("Profile not found for user {0}")]
    ProfileNotFound(UserId),

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Credit would overflow the balance
    #[error("Balance overflow for user {0}")]
    BalanceOverflow(UserId),
}

impl RewardError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            RewardError::Database(_) | RewardError::Timeout(_) => {
                "Internal server error".to_string()
            }
            RewardError::ProfileNotFound(_) => "Profile not found".to_string(),
            RewardError::BalanceOverflow(_) => "Balance overflow".to_string(),
            RewardError::InvalidAmount(_) => self.to_string(),
        }
    }
}

impl From<TimeoutError> for RewardError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => RewardError::Timeout(duration),
            TimeoutError::Database(e) => RewardError::Database(e),
        }
    }
}

/// Result type for reward operations
pub type RewardResult<T> = Result<T, RewardError>;
