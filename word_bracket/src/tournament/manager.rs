//! Tournament manager: the entry point for registration, lifecycle control
//! and match play.

use super::errors::{TournamentError, TournamentResult, ValidationError};
use super::models::{
    LegScore, MatchId, NewTournament, Participant, Tournament, TournamentId, TournamentMatch,
    TournamentStatus, TournamentSummary, UserId,
};
use super::resolver::{LegReceipt, MatchResolver};
use super::scheduler::{self, RoundSchedule, RoundScheduler, StartOutcome, TickReport};
use crate::engine::EngineContext;
use crate::notify::BracketEvent;

/// Result of a withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Withdrawal {
    /// Removed from the participant list before the bracket was built
    Unregistered,
    /// Conceded the match the user was playing
    Forfeited(TournamentMatch),
    /// Already out of the bracket; nothing to do
    AlreadyEliminated,
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    resolver: MatchResolver,
    scheduler: RoundScheduler,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(ctx: EngineContext) -> Self {
        let resolver = MatchResolver::new(ctx);
        let scheduler = RoundScheduler::new(resolver.clone());
        Self {
            resolver,
            scheduler,
        }
    }

    pub fn resolver(&self) -> &MatchResolver {
        &self.resolver
    }

    pub fn scheduler(&self) -> &RoundScheduler {
        &self.scheduler
    }

    fn ctx(&self) -> &EngineContext {
        self.resolver.context()
    }

    /// Create a tournament in `registration`
    pub async fn create_tournament(&self, request: NewTournament) -> TournamentResult<Tournament> {
        request.validate()?;
        let tournament = self
            .ctx()
            .tournaments
            .create_tournament(&request, self.ctx().now())
            .await?;
        log::info!(
            "Created tournament {} '{}' ({} slots)",
            tournament.id,
            tournament.title,
            tournament.max_participants
        );
        Ok(tournament)
    }

    /// Register a user for a tournament.
    ///
    /// # Errors
    ///
    /// * `UnknownUser` - no active profile for `user_id`
    /// * `RegistrationClosed` - outside the registration window or not in `registration`
    /// * `AlreadyRegistered`, `TournamentFull`, `LevelTooLow`
    pub async fn register_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Participant> {
        let profile = self
            .ctx()
            .profiles
            .profile(user_id)
            .await?
            .ok_or(ValidationError::UnknownUser(user_id))?;

        let repo = &self.ctx().tournaments;
        let ctx = self.ctx();
        let profile = &profile;

        let participant = ctx
            .retry_on_conflict("registration", || async move {
                let tournament = repo.get_tournament_header(tournament_id).await?;
                let now = ctx.now();
                if tournament.status != TournamentStatus::Registration
                    || now < tournament.registration_opens_at
                    || now > tournament.registration_closes_at
                {
                    return Err(ValidationError::RegistrationClosed.into());
                }
                if tournament.is_participant(user_id) {
                    return Err(ValidationError::AlreadyRegistered(user_id).into());
                }
                if tournament.is_full() {
                    return Err(ValidationError::TournamentFull.into());
                }
                if profile.level < tournament.min_level {
                    return Err(ValidationError::LevelTooLow {
                        level: profile.level,
                        min_level: tournament.min_level,
                    }
                    .into());
                }

                let participant = Participant {
                    user_id,
                    display_name: profile.display_name.clone(),
                    level: profile.level,
                    registered_at: now,
                };
                repo.add_participant(tournament_id, &participant, tournament.version)
                    .await?;
                Ok(participant)
            })
            .await?;

        log::info!("User {user_id} registered for tournament {tournament_id}");
        Ok(participant)
    }

    /// Leave a tournament.
    ///
    /// During registration the user is removed. Once the bracket is built the
    /// user forfeits the match they are seated in, including one still
    /// waiting for its opponent.
    pub async fn withdraw_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Withdrawal> {
        let repo = &self.ctx().tournaments;
        let ctx = self.ctx();

        let tournament = repo.get_tournament_header(tournament_id).await?;
        match tournament.status {
            TournamentStatus::Completed => Err(TournamentError::TournamentClosed(tournament_id)),
            TournamentStatus::Registration => {
                ctx.retry_on_conflict("withdrawal", || async move {
                    let current = repo.get_tournament_header(tournament_id).await?;
                    if current.status != TournamentStatus::Registration {
                        return Err(TournamentError::InvalidState {
                            expected: TournamentStatus::Registration,
                            actual: current.status,
                        });
                    }
                    if !current.is_participant(user_id) {
                        return Err(ValidationError::NotRegistered(user_id).into());
                    }
                    repo.remove_participant(tournament_id, user_id, current.version)
                        .await
                })
                .await?;
                log::info!("User {user_id} withdrew from tournament {tournament_id}");
                Ok(Withdrawal::Unregistered)
            }
            TournamentStatus::Active => {
                if !tournament.is_participant(user_id) {
                    return Err(ValidationError::NotRegistered(user_id).into());
                }
                let bracket = repo.get_tournament(tournament_id).await?;
                let open = bracket
                    .matches
                    .iter()
                    .find(|m| {
                        !m.is_resolved()
                            && m.seat_of(user_id).is_some()
                            && m.forfeited_by != Some(user_id)
                    });
                match open {
                    Some(m) => {
                        let resolved = self.resolver.forfeit(m.id, user_id).await?;
                        Ok(Withdrawal::Forfeited(resolved))
                    }
                    None => Ok(Withdrawal::AlreadyEliminated),
                }
            }
        }
    }

    /// Build the bracket now instead of waiting for the start date
    pub async fn start_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let tournament = self
            .ctx()
            .tournaments
            .get_tournament_header(tournament_id)
            .await?;
        if tournament.status != TournamentStatus::Registration {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::Registration,
                actual: tournament.status,
            });
        }
        if tournament.participants.len() < 2 {
            return Err(TournamentError::InsufficientPlayers {
                needed: 2,
                current: tournament.participants.len(),
            });
        }

        match self.scheduler.start_tournament(tournament_id).await? {
            StartOutcome::Started(_) => {}
            // Only reachable if every participant withdrew in between
            StartOutcome::ClosedWithoutPlayers => {
                log::warn!("Tournament {tournament_id} lost its players before starting");
            }
        }
        self.get_bracket(tournament_id).await
    }

    /// Close a tournament without a champion.
    ///
    /// In-flight submissions fail with `TournamentClosed`.
    pub async fn abort_tournament(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        let repo = &self.ctx().tournaments;
        let ctx = self.ctx();

        ctx.retry_on_conflict("abort", || async move {
            let tournament = repo.get_tournament_header(tournament_id).await?;
            if tournament.status == TournamentStatus::Completed {
                return Err(TournamentError::TournamentClosed(tournament_id));
            }
            repo.complete_tournament(tournament_id, None, true, tournament.version, ctx.now())
                .await
        })
        .await?;

        log::warn!("Tournament {tournament_id} aborted");
        ctx.notify(BracketEvent::TournamentCompleted {
            tournament_id,
            champion_id: None,
        });
        Ok(())
    }

    /// Tournament with participants and the full match tree
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.ctx().tournaments.get_tournament(tournament_id).await
    }

    /// Round labels and deadlines
    pub async fn get_schedule(&self, tournament_id: TournamentId) -> TournamentResult<Vec<RoundSchedule>> {
        let tournament = self
            .ctx()
            .tournaments
            .get_tournament_header(tournament_id)
            .await?;
        Ok(scheduler::round_schedule(&tournament))
    }

    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<TournamentSummary>> {
        self.ctx().tournaments.list_tournaments(status).await
    }

    pub async fn get_match(&self, match_id: MatchId) -> TournamentResult<TournamentMatch> {
        self.ctx().tournaments.get_match(match_id).await
    }

    pub async fn submit_leg(
        &self,
        match_id: MatchId,
        player_id: UserId,
        score: i64,
        elapsed_ms: i64,
    ) -> TournamentResult<LegReceipt> {
        self.resolver
            .submit_leg(match_id, player_id, LegScore::new(score, elapsed_ms))
            .await
    }

    pub async fn forfeit(&self, match_id: MatchId, user_id: UserId) -> TournamentResult<TournamentMatch> {
        self.resolver.forfeit(match_id, user_id).await
    }

    /// One scheduler sweep
    pub async fn tick(&self) -> TournamentResult<TickReport> {
        self.scheduler.tick().await
    }

    /// Retry the reward payout of a completed tournament
    pub async fn pay_rewards(&self, tournament_id: TournamentId) -> TournamentResult<usize> {
        self.resolver.pay_rewards(tournament_id).await
    }
}
