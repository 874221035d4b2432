//! Challenge API handlers.
//!
//! The creator plays first; the challenge stays open until someone allowed
//! to join submits a score or it expires.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use word_bracket::challenge::{Challenge, ChallengeConfig, ChallengeId};
use word_bracket::tournament::{LegScore, MatchId, UserId};

use super::AppState;
use super::error::ApiError;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct CreateChallengeRequest {
    pub creator_id: UserId,
    #[serde(flatten)]
    pub config: ChallengeConfig,
    pub score: i64,
    pub elapsed_ms: i64,
    /// Play the legs of this bracket match
    #[serde(default)]
    pub tournament_match_id: Option<MatchId>,
}

#[derive(Debug, Deserialize)]
pub struct JoinChallengeRequest {
    pub user_id: UserId,
    pub score: i64,
    pub elapsed_ms: i64,
}

#[derive(Debug, Deserialize)]
pub struct OpenQuery {
    pub viewer_id: UserId,
}

/// # Endpoint
///
/// `POST /api/v1/challenges`
pub async fn create_challenge(
    State(state): State<AppState>,
    Json(request): Json<CreateChallengeRequest>,
) -> Result<(StatusCode, Json<Challenge>), ApiError> {
    let challenge = state
        .challenges
        .create(
            request.creator_id,
            request.config,
            LegScore::new(request.score, request.elapsed_ms),
            request.tournament_match_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(challenge)))
}

/// # Endpoint
///
/// `GET /api/v1/challenges/{id}`
pub async fn get_challenge(
    State(state): State<AppState>,
    Path(challenge_id): Path<ChallengeId>,
) -> Result<Json<Challenge>, ApiError> {
    Ok(Json(state.challenges.get(challenge_id).await?))
}

/// Join and decide the challenge
///
/// # Endpoint
///
/// `POST /api/v1/challenges/{id}/join`
pub async fn join_challenge(
    State(state): State<AppState>,
    Path(challenge_id): Path<ChallengeId>,
    Json(request): Json<JoinChallengeRequest>,
) -> Result<Json<Challenge>, ApiError> {
    let challenge = state
        .challenges
        .join(
            challenge_id,
            request.user_id,
            LegScore::new(request.score, request.elapsed_ms),
        )
        .await?;
    metrics::challenges_completed_total();
    Ok(Json(challenge))
}

/// Challenges `viewer_id` may join
///
/// # Endpoint
///
/// `GET /api/v1/challenges/open?viewer_id=42`
pub async fn open_challenges(
    State(state): State<AppState>,
    Query(query): Query<OpenQuery>,
) -> Result<Json<Vec<Challenge>>, ApiError> {
    Ok(Json(state.challenges.open_challenges(query.viewer_id).await?))
}
