//! One-on-one word challenges.
//!
//! A challenge records the creator's score and waits for an opponent. It is
//! decided with the same comparison as bracket matches. A challenge linked to
//! a tournament match plays that match's legs.

pub mod errors;
pub mod gateway;
pub mod models;

pub use errors::{ChallengeError, ChallengeResult};
pub use gateway::ChallengeGateway;
pub use models::{Challenge, ChallengeConfig, ChallengeId, ChallengeStatus, Visibility};
