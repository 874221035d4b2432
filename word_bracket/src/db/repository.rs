//! Repository trait definitions for testability and dependency injection.
//!
//! Every mutation of a tournament or match is a compare-and-swap on the
//! record's `version`: the caller passes the version it read and the write
//! fails with a conflict if anything else wrote in between.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::challenge::{Challenge, ChallengeId, ChallengeResult};
use crate::tournament::errors::TournamentResult;
use crate::tournament::models::{
    MatchId, NewTournament, Participant, Tournament, TournamentId, TournamentMatch,
    TournamentStatus, TournamentSummary, UserId,
};

/// Trait for tournament and match persistence
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Insert a tournament in `registration`
    async fn create_tournament(
        &self,
        request: &NewTournament,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament>;

    /// Load a tournament with participants and every match
    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Tournament>;

    /// Load a tournament with participants but without matches
    async fn get_tournament_header(&self, id: TournamentId) -> TournamentResult<Tournament>;

    /// List tournaments, optionally filtered by status
    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<TournamentSummary>>;

    /// Headers the scheduler must look at: registrations whose start date
    /// has passed, active tournaments and completed ones with unpaid rewards
    async fn tick_candidates(&self, now: DateTime<Utc>) -> TournamentResult<Vec<Tournament>>;

    /// Append a participant (CAS on tournament version)
    async fn add_participant(
        &self,
        id: TournamentId,
        participant: &Participant,
        expected_version: i64,
    ) -> TournamentResult<()>;

    /// Remove a participant (CAS on tournament version)
    async fn remove_participant(
        &self,
        id: TournamentId,
        user_id: UserId,
        expected_version: i64,
    ) -> TournamentResult<()>;

    /// Move `registration` to `active` and insert the bracket in one step
    async fn activate(
        &self,
        id: TournamentId,
        expected_version: i64,
        matches: &[TournamentMatch],
        now: DateTime<Utc>,
    ) -> TournamentResult<()>;

    /// Move `current_round` from `from_round` to `to_round` (CAS)
    async fn advance_round(
        &self,
        id: TournamentId,
        from_round: u32,
        to_round: u32,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> TournamentResult<()>;

    /// Mark the tournament completed (CAS)
    async fn complete_tournament(
        &self,
        id: TournamentId,
        champion_id: Option<UserId>,
        aborted: bool,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> TournamentResult<()>;

    /// Record that every reward has been credited
    async fn mark_rewards_paid(&self, id: TournamentId) -> TournamentResult<()>;

    /// Load a match by id
    async fn get_match(&self, match_id: MatchId) -> TournamentResult<TournamentMatch>;

    /// Load the match at `(round, slot)`
    async fn find_match(
        &self,
        tournament_id: TournamentId,
        round: u32,
        slot: u32,
    ) -> TournamentResult<Option<TournamentMatch>>;

    /// Matches of one round in slot order
    async fn round_matches(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> TournamentResult<Vec<TournamentMatch>>;

    /// Write a match if its stored version still equals `m.version` and its
    /// tournament is active; returns the stored match with the bumped version
    async fn update_match(&self, m: &TournamentMatch) -> TournamentResult<TournamentMatch>;
}

/// Trait for challenge persistence
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// Insert a new challenge
    async fn insert_challenge(&self, challenge: &Challenge) -> ChallengeResult<()>;

    /// Load a challenge by id
    async fn get_challenge(&self, id: ChallengeId) -> ChallengeResult<Challenge>;

    /// Write a challenge if its stored version still equals `challenge.version`
    async fn update_challenge(&self, challenge: &Challenge) -> ChallengeResult<Challenge>;

    /// Pending, unexpired challenges `viewer_id` may join, newest first
    async fn open_challenges(
        &self,
        viewer_id: UserId,
        now: DateTime<Utc>,
    ) -> ChallengeResult<Vec<Challenge>>;
}
