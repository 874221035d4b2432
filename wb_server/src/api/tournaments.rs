//! Tournament API handlers.
//!
//! Creation, registration, lifecycle control and bracket views.
//!
//! # Examples
//!
//! Register for a tournament:
//! ```bash
//! curl -X POST http://localhost:6970/api/v1/tournaments/1/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"user_id": 42}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use word_bracket::tournament::{
    NewTournament, Participant, RoundSchedule, Tournament, TournamentId, TournamentMatch,
    TournamentStatus, TournamentSummary, UserId, Withdrawal,
};

use super::AppState;
use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub user_id: UserId,
}

/// Bracket with its round deadlines
#[derive(Debug, Serialize)]
pub struct BracketResponse {
    pub tournament: Tournament,
    pub schedule: Vec<RoundSchedule>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WithdrawResponse {
    Unregistered,
    Forfeited {
        #[serde(rename = "match")]
        match_state: TournamentMatch,
    },
    AlreadyEliminated,
}

impl From<Withdrawal> for WithdrawResponse {
    fn from(withdrawal: Withdrawal) -> Self {
        match withdrawal {
            Withdrawal::Unregistered => WithdrawResponse::Unregistered,
            Withdrawal::Forfeited(m) => WithdrawResponse::Forfeited { match_state: m },
            Withdrawal::AlreadyEliminated => WithdrawResponse::AlreadyEliminated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PayoutResponse {
    pub credited: usize,
}

/// Create a tournament
///
/// # Endpoint
///
/// `POST /api/v1/tournaments`
pub async fn create_tournament(
    State(state): State<AppState>,
    Json(request): Json<NewTournament>,
) -> Result<(StatusCode, Json<Tournament>), ApiError> {
    let tournament = state.manager.create_tournament(request).await?;
    tracing::info!(tournament_id = tournament.id, "Tournament created");
    Ok((StatusCode::CREATED, Json(tournament)))
}

/// List tournaments, optionally filtered by `?status=registration|active|completed`
///
/// # Endpoint
///
/// `GET /api/v1/tournaments`
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TournamentSummary>>, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(
            TournamentStatus::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown status: {raw}")))?,
        ),
    };
    Ok(Json(state.manager.list_tournaments(status).await?))
}

/// Full bracket and schedule
///
/// # Endpoint
///
/// `GET /api/v1/tournaments/{id}`
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<BracketResponse>, ApiError> {
    let tournament = state.manager.get_bracket(tournament_id).await?;
    let schedule = word_bracket::tournament::scheduler::round_schedule(&tournament);
    Ok(Json(BracketResponse {
        tournament,
        schedule,
    }))
}

/// Register a user
///
/// # Endpoint
///
/// `POST /api/v1/tournaments/{id}/register`
pub async fn register(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<UserRequest>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let participant = state
        .manager
        .register_participant(tournament_id, request.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// Withdraw a user; forfeits their open match once the bracket is built
///
/// # Endpoint
///
/// `POST /api/v1/tournaments/{id}/withdraw`
pub async fn withdraw(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<UserRequest>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let withdrawal = state
        .manager
        .withdraw_participant(tournament_id, request.user_id)
        .await?;
    if matches!(withdrawal, Withdrawal::Forfeited(_)) {
        crate::metrics::forfeits_total();
    }
    Ok(Json(withdrawal.into()))
}

/// Build the bracket ahead of the start date
///
/// # Endpoint
///
/// `POST /api/v1/tournaments/{id}/start`
pub async fn start(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Tournament>, ApiError> {
    Ok(Json(state.manager.start_tournament(tournament_id).await?))
}

/// Close without a champion
///
/// # Endpoint
///
/// `POST /api/v1/tournaments/{id}/abort`
pub async fn abort(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Tournament>, ApiError> {
    state.manager.abort_tournament(tournament_id).await?;
    Ok(Json(state.manager.get_bracket(tournament_id).await?))
}

/// Retry reward payout for a completed tournament
///
/// # Endpoint
///
/// `POST /api/v1/tournaments/{id}/rewards`
pub async fn pay_rewards(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<PayoutResponse>, ApiError> {
    let credited = state.manager.pay_rewards(tournament_id).await?;
    Ok(Json(PayoutResponse { credited }))
}
