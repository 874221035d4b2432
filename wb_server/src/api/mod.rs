//! HTTP API for the tournament server.
//!
//! # Modules
//!
//! - [`tournaments`]: Creation, registration, lifecycle control, bracket views
//! - [`matches`]: Leg submission and forfeits
//! - [`challenges`]: Standalone and bracket-linked challenges
//! - [`error`]: Engine error to HTTP status mapping
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health
//! POST /api/v1/tournaments
//! GET  /api/v1/tournaments?status=registration|active|completed
//! GET  /api/v1/tournaments/{id}
//! POST /api/v1/tournaments/{id}/register      {"user_id"}
//! POST /api/v1/tournaments/{id}/withdraw      {"user_id"}
//! POST /api/v1/tournaments/{id}/start
//! POST /api/v1/tournaments/{id}/abort
//! POST /api/v1/tournaments/{id}/rewards
//! GET  /api/v1/matches/{id}
//! POST /api/v1/matches/{id}/legs              {"player_id", "score", "elapsed_ms"}
//! POST /api/v1/matches/{id}/forfeit           {"user_id"}
//! POST /api/v1/challenges
//! GET  /api/v1/challenges/open?viewer_id=
//! GET  /api/v1/challenges/{id}
//! POST /api/v1/challenges/{id}/join           {"user_id", "score", "elapsed_ms"}
//! ```
//!
//! Callers are trusted to pass the acting user's id; authentication sits in
//! front of this service.
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod challenges;
pub mod error;
pub mod matches;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use word_bracket::db::Database;
use word_bracket::{ChallengeGateway, TournamentManager};

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is a handle over shared state.
#[derive(Clone)]
pub struct AppState {
    pub manager: TournamentManager,
    pub challenges: ChallengeGateway,
    /// Present when backed by Postgres; used by the health check
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use wb_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:6970").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/v1/tournaments",
            post(tournaments::create_tournament).get(tournaments::list_tournaments),
        )
        .route("/api/v1/tournaments/{id}", get(tournaments::get_tournament))
        .route("/api/v1/tournaments/{id}/register", post(tournaments::register))
        .route("/api/v1/tournaments/{id}/withdraw", post(tournaments::withdraw))
        .route("/api/v1/tournaments/{id}/start", post(tournaments::start))
        .route("/api/v1/tournaments/{id}/abort", post(tournaments::abort))
        .route("/api/v1/tournaments/{id}/rewards", post(tournaments::pay_rewards))
        .route("/api/v1/matches/{id}", get(matches::get_match))
        .route("/api/v1/matches/{id}/legs", post(matches::submit_leg))
        .route("/api/v1/matches/{id}/forfeit", post(matches::forfeit))
        .route("/api/v1/challenges", post(challenges::create_challenge))
        .route("/api/v1/challenges/open", get(challenges::open_challenges))
        .route("/api/v1/challenges/{id}", get(challenges::get_challenge))
        .route("/api/v1/challenges/{id}/join", post(challenges::join_challenge))
        // Runs after routing so the matched template is available
        .route_layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
///
/// Reports database connectivity when running on Postgres.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => Some(true),
            Err(e) => {
                tracing::error!("Database health check failed: {}", e);
                Some(false)
            }
        },
        None => None,
    };
    let healthy = database != Some(false);

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": if state.database.is_some() { "postgres" } else { "memory" },
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
