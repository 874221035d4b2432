//! Mapping from engine errors to HTTP responses.
//!
//! Every failure is returned as `{"error": "<message>"}` where the message is
//! the engine's client-safe text; storage failures never reach the body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use word_bracket::challenge::ChallengeError;
use word_bracket::rewards::RewardError;
use word_bracket::tournament::{TournamentError, ValidationError};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error carrying the status and client message
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<TournamentError> for ApiError {
    fn from(err: TournamentError) -> Self {
        let status = tournament_status(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "Engine error");
        }
        Self {
            status,
            message: err.client_message(),
        }
    }
}

impl From<ChallengeError> for ApiError {
    fn from(err: ChallengeError) -> Self {
        let status = match &err {
            ChallengeError::Tournament(inner) => tournament_status(inner),
            ChallengeError::Validation(v) => validation_status(v),
            ChallengeError::NotFound(_) => StatusCode::NOT_FOUND,
            ChallengeError::Expired(_) => StatusCode::GONE,
            ChallengeError::AlreadyCompleted(_) | ChallengeError::ConcurrencyConflict(_) => {
                StatusCode::CONFLICT
            }
            ChallengeError::SelfJoin => StatusCode::BAD_REQUEST,
            ChallengeError::NotTarget { .. } => StatusCode::FORBIDDEN,
            ChallengeError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChallengeError::Database(_) | ChallengeError::Corrupt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "Challenge error");
        }
        Self {
            status,
            message: err.client_message(),
        }
    }
}

fn tournament_status(err: &TournamentError) -> StatusCode {
    match err {
        TournamentError::NotFound(_) | TournamentError::MatchNotFound(_) => StatusCode::NOT_FOUND,
        TournamentError::Validation(v) => validation_status(v),
        TournamentError::NotParticipant { .. } => StatusCode::FORBIDDEN,
        TournamentError::DeadlineExceeded { .. }
        | TournamentError::TournamentClosed(_)
        | TournamentError::InvalidState { .. }
        | TournamentError::InsufficientPlayers { .. }
        | TournamentError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
        TournamentError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        TournamentError::Reward(RewardError::Timeout(_)) => StatusCode::SERVICE_UNAVAILABLE,
        TournamentError::Database(_)
        | TournamentError::Serialization(_)
        | TournamentError::Reward(_)
        | TournamentError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn validation_status(err: &ValidationError) -> StatusCode {
    match err {
        ValidationError::UnknownUser(_) => StatusCode::NOT_FOUND,
        ValidationError::LevelTooLow { .. } => StatusCode::FORBIDDEN,
        ValidationError::RegistrationClosed
        | ValidationError::TournamentFull
        | ValidationError::AlreadyRegistered(_)
        | ValidationError::NotRegistered(_)
        | ValidationError::MatchNotReady(_)
        | ValidationError::LegNotOpen { .. }
        | ValidationError::LegsComplete(_)
        | ValidationError::MatchResolved(_)
        | ValidationError::SlotOccupied { .. } => StatusCode::CONFLICT,
        ValidationError::InvalidBracketSize(_)
        | ValidationError::TooManyParticipants { .. }
        | ValidationError::DuplicateParticipant(_)
        | ValidationError::NegativeScore
        | ValidationError::LegOutOfRange { .. }
        | ValidationError::InvalidField { .. } => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_tournament_errors_map_to_statuses() {
        let cases = [
            (TournamentError::NotFound(1), StatusCode::NOT_FOUND),
            (
                TournamentError::NotParticipant {
                    user_id: 1,
                    match_id: Uuid::nil(),
                },
                StatusCode::FORBIDDEN,
            ),
            (TournamentError::TournamentClosed(1), StatusCode::CONFLICT),
            (
                ValidationError::NegativeScore.into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ValidationError::TournamentFull.into(),
                StatusCode::CONFLICT,
            ),
            (
                TournamentError::Corrupt("bracket row 7".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let err = ApiError::from(TournamentError::Corrupt("bracket row 7".to_string()));
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_challenge_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(ChallengeError::Expired(Uuid::nil())).status,
            StatusCode::GONE
        );
        assert_eq!(
            ApiError::from(ChallengeError::SelfJoin).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ChallengeError::Tournament(TournamentError::MatchNotFound(
                Uuid::nil()
            )))
            .status,
            StatusCode::NOT_FOUND
        );
    }
}
