//! Single-elimination word-quiz tournaments.
//!
//! This module provides:
//! - Bracket construction with seeded pairing and bye settlement
//! - Two-leg matches decided by aggregate score, then time
//! - Winner promotion and round advancement
//! - Deadline-driven walkovers via the scheduler sweep
//! - Reward payout for final placements
//!
//! ## Example
//!
//! ```no_run
//! use word_bracket::db::InMemoryStore;
//! use word_bracket::engine::EngineContext;
//! use word_bracket::rewards::InMemoryProfileStore;
//! use word_bracket::tournament::TournamentManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = EngineContext::new(
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(InMemoryProfileStore::new()),
//!     );
//!     let manager = TournamentManager::new(ctx);
//!
//!     let report = manager.tick().await?;
//!     println!("Started {} tournaments", report.started);
//!
//!     Ok(())
//! }
//! ```

pub mod bracket;
pub mod builder;
pub mod errors;
pub mod manager;
pub mod models;
pub mod resolver;
pub mod scheduler;
pub mod scoring;

pub use bracket::Bracket;
pub use builder::BracketBuilder;
pub use errors::{TournamentError, TournamentResult, ValidationError};
pub use manager::{TournamentManager, Withdrawal};
pub use models::{
    Difficulty, LegScore, MatchId, MatchPlayer, MatchStatus, NewTournament, Participant,
    PlayerLegs, QuizConfig, Resolution, Rewards, Seat, Tournament, TournamentId,
    TournamentMatch, TournamentStatus, TournamentSummary, UserId,
};
pub use resolver::{AdvanceOutcome, LegReceipt, MatchResolver};
pub use scheduler::{RoundSchedule, RoundScheduler, StartOutcome, TickReport};
