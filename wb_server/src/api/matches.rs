//! Match API handlers.
//!
//! A leg is one quiz attempt; each player submits theirs independently and
//! the match resolves once the final leg lands.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use word_bracket::tournament::{MatchId, TournamentMatch, UserId};

use super::AppState;
use super::error::ApiError;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct LegRequest {
    pub player_id: UserId,
    pub score: i64,
    pub elapsed_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct LegResponse {
    /// Leg number that was filled
    pub leg: u8,
    /// Whether this leg decided the match
    pub completed: bool,
    #[serde(rename = "match")]
    pub match_state: TournamentMatch,
}

#[derive(Debug, Deserialize)]
pub struct ForfeitRequest {
    pub user_id: UserId,
}

/// # Endpoint
///
/// `GET /api/v1/matches/{id}`
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<Json<TournamentMatch>, ApiError> {
    Ok(Json(state.manager.get_match(match_id).await?))
}

/// Submit the player's next leg
///
/// # Endpoint
///
/// `POST /api/v1/matches/{id}/legs`
pub async fn submit_leg(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<LegRequest>,
) -> Result<Json<LegResponse>, ApiError> {
    let receipt = state
        .manager
        .submit_leg(match_id, request.player_id, request.score, request.elapsed_ms)
        .await?;
    metrics::legs_submitted_total(receipt.completed);

    Ok(Json(LegResponse {
        leg: receipt.leg,
        completed: receipt.completed,
        match_state: receipt.match_state,
    }))
}

/// Concede the match
///
/// # Endpoint
///
/// `POST /api/v1/matches/{id}/forfeit`
pub async fn forfeit(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<ForfeitRequest>,
) -> Result<Json<TournamentMatch>, ApiError> {
    let resolved = state.manager.forfeit(match_id, request.user_id).await?;
    metrics::forfeits_total();
    Ok(Json(resolved))
}
