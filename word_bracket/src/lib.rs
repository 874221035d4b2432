//! # Word Bracket
//!
//! A single-elimination tournament engine for timed word quizzes.
//!
//! Registered players are paired into a power-of-two bracket. Each match is
//! played over two legs (one in the final); the higher aggregate score wins,
//! then the lower total time, then the higher seed. Winners are promoted round
//! by round until a champion is crowned and rewards are credited.
//!
//! ## Architecture
//!
//! - **Bracket**: matches in an arena indexed by `(round, slot)`, with pure
//!   promotion and feeder math
//! - **BracketBuilder**: seeded pairing, byes and void matches
//! - **MatchResolver**: leg submission, winner promotion, round advance
//! - **RoundScheduler**: deadlines, walkovers and the periodic sweep
//! - **ChallengeGateway**: standalone duels that can feed bracket legs
//! - **TournamentRepository**: the persisted state, written with
//!   compare-and-swap on versions
//!
//! ## Core Modules
//!
//! - [`tournament`]: models, bracket math, resolver, scheduler and manager
//! - [`challenge`]: challenge models and gateway
//! - [`db`]: Postgres and in-memory state stores
//! - [`rewards`]: profile lookup and the idempotent reward ledger
//!
//! ## Example
//!
//! ```
//! use word_bracket::tournament::{BracketBuilder, Participant};
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let players: Vec<Participant> = (1..=5)
//!     .map(|id| Participant {
//!         user_id: id,
//!         display_name: format!("player{id}"),
//!         level: 1,
//!         registered_at: now,
//!     })
//!     .collect();
//!
//! let bracket = BracketBuilder::new(1, 8).unwrap().build(&players, now).unwrap();
//! assert_eq!(bracket.matches().len(), 7);
//! ```

pub mod challenge;
pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod notify;
pub mod rewards;
pub mod tournament;

pub use challenge::{ChallengeGateway, ChallengeError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::EngineContext;
pub use notify::{BracketEvent, BroadcastNotifier, NoopNotifier, Notifier};
pub use tournament::{TournamentError, TournamentManager, TournamentResult};
