//! Challenge creation and joining.

use super::errors::{ChallengeError, ChallengeResult};
use super::models::{Challenge, ChallengeConfig, ChallengeId, ChallengeStatus};
use crate::db::ChallengeRepository;
use crate::notify::BracketEvent;
use crate::tournament::errors::TournamentError;
use crate::tournament::models::{LegScore, MatchId, UserId};
use crate::tournament::resolver::MatchResolver;
use std::sync::Arc;

/// Standalone duels, optionally playing the legs of a bracket match
#[derive(Clone)]
pub struct ChallengeGateway {
    challenges: Arc<dyn ChallengeRepository>,
    resolver: MatchResolver,
}

impl ChallengeGateway {
    pub fn new(challenges: Arc<dyn ChallengeRepository>, resolver: MatchResolver) -> Self {
        Self {
            challenges,
            resolver,
        }
    }

    /// Open a challenge with the creator's score.
    ///
    /// With a `tournament_match_id` the score is first submitted as the
    /// creator's next leg of that match; if the bracket rejects it, no
    /// challenge is created.
    pub async fn create(
        &self,
        creator_id: UserId,
        config: ChallengeConfig,
        creator_score: LegScore,
        tournament_match_id: Option<MatchId>,
    ) -> ChallengeResult<Challenge> {
        config.validate(creator_id)?;
        creator_score.validate()?;

        if let Some(match_id) = tournament_match_id {
            self.resolver
                .submit_leg(match_id, creator_id, creator_score)
                .await?;
        }

        let ctx = self.resolver.context();
        let challenge = Challenge::new(
            creator_id,
            config,
            creator_score,
            tournament_match_id,
            ctx.now(),
            ctx.config.challenge_ttl(),
        );
        self.challenges.insert_challenge(&challenge).await?;

        log::info!(
            "User {} created {} challenge {}",
            creator_id,
            challenge.config.visibility.as_str(),
            challenge.id
        );
        Ok(challenge)
    }

    /// Join a pending challenge and decide it.
    ///
    /// Completion is a compare-and-swap on the challenge version, so of two
    /// concurrent joiners exactly one wins and the other sees
    /// `AlreadyCompleted`. For a linked challenge the opponent's leg is then
    /// submitted to the bracket; if that fails the challenge is reopened.
    pub async fn join(
        &self,
        challenge_id: ChallengeId,
        opponent_id: UserId,
        score: LegScore,
    ) -> ChallengeResult<Challenge> {
        score.validate()?;
        let completed = self.complete_once(challenge_id, opponent_id, score).await?;

        if let Some(match_id) = completed.tournament_match_id {
            if let Err(e) = self.resolver.submit_leg(match_id, opponent_id, score).await {
                log::warn!(
                    "Linked leg for challenge {challenge_id} rejected, reopening: {e}"
                );
                self.reopen(completed).await;
                return Err(e.into());
            }
        }

        let winner_id = completed.winner_id.unwrap_or(completed.creator_id);
        log::info!("Challenge {challenge_id} completed, winner {winner_id}");
        self.resolver.context().notify(BracketEvent::ChallengeCompleted {
            challenge_id,
            winner_id,
        });
        Ok(completed)
    }

    async fn complete_once(
        &self,
        challenge_id: ChallengeId,
        opponent_id: UserId,
        score: LegScore,
    ) -> ChallengeResult<Challenge> {
        let ctx = self.resolver.context();
        let max_attempts = ctx.config.max_cas_retries.max(1);
        let mut attempt = 1;

        loop {
            let current = self.challenges.get_challenge(challenge_id).await?;
            let now = ctx.now();
            current.check_joinable(opponent_id, now)?;

            if let Some(match_id) = current.tournament_match_id {
                let m = ctx.tournaments.get_match(match_id).await?;
                if m.seat_of(opponent_id).is_none() {
                    return Err(TournamentError::NotParticipant {
                        user_id: opponent_id,
                        match_id,
                    }
                    .into());
                }
            }

            let mut next = current.clone();
            next.complete(opponent_id, score, now);
            match self.challenges.update_challenge(&next).await {
                Err(ChallengeError::ConcurrencyConflict(_)) if attempt < max_attempts => {
                    attempt += 1;
                    tokio::task::yield_now().await;
                }
                other => return other,
            }
        }
    }

    /// Put a completed challenge back to pending
    async fn reopen(&self, completed: Challenge) {
        let id = completed.id;
        let reopened = Challenge {
            opponent_id: None,
            opponent_score: None,
            winner_id: None,
            status: ChallengeStatus::Pending,
            completed_at: None,
            ..completed
        };
        if let Err(e) = self.challenges.update_challenge(&reopened).await {
            log::error!("Failed to reopen challenge {id}: {e}");
        }
    }

    pub async fn get(&self, challenge_id: ChallengeId) -> ChallengeResult<Challenge> {
        self.challenges.get_challenge(challenge_id).await
    }

    /// Pending challenges `viewer_id` may join
    pub async fn open_challenges(&self, viewer_id: UserId) -> ChallengeResult<Vec<Challenge>> {
        let now = self.resolver.context().now();
        self.challenges.open_challenges(viewer_id, now).await
    }
}
