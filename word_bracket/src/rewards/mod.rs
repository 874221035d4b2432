//! Profile lookup and tournament reward payouts.
//!
//! Rewards go through an append-only ledger keyed by idempotency key, so a
//! payout retried by a later scheduler tick never credits twice.
//!
//! ## Example
//!
//! ```no_run
//! use word_bracket::db::Database;
//! use word_bracket::rewards::{PgProfileStore, ProfileStore, RewardCredit, RewardKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let store = PgProfileStore::new(db.pool().clone());
//!
//!     let credit = RewardCredit::new(1, 42, RewardKind::First, 100);
//!     let outcome = store.credit_reward(&credit).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ledger;
pub mod memory;
pub mod models;

pub use errors::{RewardError, RewardResult};
pub use ledger::PgProfileStore;
pub use memory::InMemoryProfileStore;
pub use models::{CreditOutcome, Profile, RewardCredit, RewardEntry, RewardKind, idempotency_key};

use crate::tournament::models::UserId;
use async_trait::async_trait;

/// Profile lookup and reward crediting
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up a user's profile
    async fn profile(&self, user_id: UserId) -> RewardResult<Option<Profile>>;

    /// Credit a reward once per idempotency key
    async fn credit_reward(&self, credit: &RewardCredit) -> RewardResult<CreditOutcome>;

    /// Reward history for a user, newest first
    async fn entries(&self, user_id: UserId, limit: i64) -> RewardResult<Vec<RewardEntry>>;
}
