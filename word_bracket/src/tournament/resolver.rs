//! Leg submission, match resolution and winner promotion.
//!
//! Every match write is a compare-and-swap on the match version, retried a
//! bounded number of times with freshly read state. Resolving a match pushes
//! its winner into the next round, settles any match that became a bye or
//! void as a result, and advances the tournament's current round once the
//! round is fully resolved.

use super::bracket::{self, PromotionTarget};
use super::errors::{TournamentError, TournamentResult, ValidationError};
use super::models::{
    LegScore, MatchId, MatchPlayer, Resolution, Tournament, TournamentId, TournamentMatch,
    TournamentStatus, UserId,
};
use super::scheduler;
use crate::engine::EngineContext;
use crate::notify::BracketEvent;
use crate::rewards::{CreditOutcome, RewardCredit, RewardKind};

/// Outcome of an accepted leg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegReceipt {
    /// Match as stored after the write
    pub match_state: TournamentMatch,
    /// Leg number that was filled
    pub leg: u8,
    /// Whether this leg decided the match
    pub completed: bool,
}

/// What a round advance pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceOutcome {
    pub rounds_advanced: usize,
    pub completed: bool,
}

/// Final placements of a completed tournament.
///
/// First goes to the champion, second to the final's loser, third to both
/// semifinal losers and participation to everyone else.
pub fn placements(tournament: &Tournament) -> Vec<(UserId, RewardKind)> {
    fn place(placed: &mut Vec<(UserId, RewardKind)>, user_id: UserId, kind: RewardKind) {
        if !placed.iter().any(|(id, _)| *id == user_id) {
            placed.push((user_id, kind));
        }
    }

    let mut placed = Vec::with_capacity(tournament.participants.len());
    if let Some(champion) = tournament.champion_id {
        place(&mut placed, champion, RewardKind::First);
    }
    if let Some(runner_up) = tournament.final_match().and_then(TournamentMatch::loser_id) {
        place(&mut placed, runner_up, RewardKind::Second);
    }
    if tournament.max_participants >= 4 {
        for semi in tournament.matches_in_round(4) {
            if let Some(loser) = semi.loser_id() {
                place(&mut placed, loser, RewardKind::Third);
            }
        }
    }
    for participant in &tournament.participants {
        place(&mut placed, participant.user_id, RewardKind::Participation);
    }
    placed
}

/// Records legs and moves winners through the bracket
#[derive(Clone)]
pub struct MatchResolver {
    ctx: EngineContext,
}

impl MatchResolver {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Record one leg for `player_id`.
    ///
    /// # Errors
    ///
    /// * `TournamentClosed` - tournament completed or aborted
    /// * `NotParticipant` - `player_id` is not seated in the match
    /// * `DeadlineExceeded` - the round deadline passed; the leg is dropped
    /// * `Validation` - match not ready, leg not open, legs complete, negative score
    pub async fn submit_leg(
        &self,
        match_id: MatchId,
        player_id: UserId,
        leg: LegScore,
    ) -> TournamentResult<LegReceipt> {
        leg.validate()?;
        let repo = &self.ctx.tournaments;
        let ctx = &self.ctx;

        let (receipt, tournament_id) = self
            .ctx
            .retry_on_conflict("leg submission", || async move {
                let m = repo.get_match(match_id).await?;
                let tournament = repo.get_tournament_header(m.tournament_id).await?;
                if tournament.status != TournamentStatus::Active {
                    return Err(TournamentError::TournamentClosed(tournament.id));
                }
                let seat = m.seat_of(player_id).ok_or(TournamentError::NotParticipant {
                    user_id: player_id,
                    match_id,
                })?;
                if m.is_resolved() {
                    return Err(ValidationError::MatchResolved(match_id).into());
                }
                if !m.has_both_players() {
                    return Err(ValidationError::MatchNotReady(match_id).into());
                }

                let now = ctx.now();
                let deadline = scheduler::round_deadline(&tournament, m.round);
                if now > deadline {
                    return Err(TournamentError::DeadlineExceeded {
                        match_id,
                        round: m.round,
                        deadline,
                    });
                }

                let leg_number = if m.legs(seat).leg1.is_none() { 1 } else { 2 };
                let mut next = m.clone();
                let completed = next.record_leg(seat, leg, now)?;
                let written = repo.update_match(&next).await?;
                Ok((
                    LegReceipt {
                        match_state: written,
                        leg: leg_number,
                        completed,
                    },
                    tournament.id,
                ))
            })
            .await?;

        log::info!(
            "Leg {} recorded for user {} in match {} (round {})",
            receipt.leg,
            player_id,
            match_id,
            receipt.match_state.round
        );

        if receipt.completed {
            log::info!(
                "Match {} decided: winner {:?}",
                match_id,
                receipt.match_state.winner_id
            );
            self.propagate(tournament_id, receipt.match_state.clone())
                .await?;
            self.advance_rounds(tournament_id).await?;
        }
        Ok(receipt)
    }

    /// Concede an unresolved match; the opponent advances.
    ///
    /// If no opponent is seated yet the concession is recorded on the match
    /// and decides it for whoever is promoted into the other seat, or makes
    /// it void if nobody arrives.
    pub async fn forfeit(&self, match_id: MatchId, user_id: UserId) -> TournamentResult<TournamentMatch> {
        let repo = &self.ctx.tournaments;
        let ctx = &self.ctx;

        let conceded = self
            .ctx
            .retry_on_conflict("forfeit", || async move {
                let m = repo.get_match(match_id).await?;
                let tournament = repo.get_tournament_header(m.tournament_id).await?;
                if tournament.status != TournamentStatus::Active {
                    return Err(TournamentError::TournamentClosed(tournament.id));
                }
                let seat = m.seat_of(user_id).ok_or(TournamentError::NotParticipant {
                    user_id,
                    match_id,
                })?;
                if m.is_resolved() {
                    return Err(ValidationError::MatchResolved(match_id).into());
                }
                if m.forfeited_by == Some(user_id) {
                    return Ok(m);
                }

                let mut next = m.clone();
                next.forfeited_by = Some(user_id);
                next.updated_at = ctx.now();
                if m.has_both_players() {
                    let winner = m.player(seat.other()).map(|p| p.user_id);
                    next.complete(winner, Resolution::Forfeit, ctx.now());
                }
                repo.update_match(&next).await
            })
            .await?;

        let mut current = conceded;
        if current.is_resolved() {
            log::info!("User {user_id} forfeited match {match_id}");
        } else {
            log::info!("User {user_id} conceded match {match_id} before an opponent arrived");
            if let Some(settled) = self.settle_if_unplayable(current.clone()).await? {
                current = settled;
            }
        }
        if current.is_resolved() {
            self.propagate(current.tournament_id, current.clone())
                .await?;
            self.advance_rounds(current.tournament_id).await?;
        }
        Ok(current)
    }

    /// Resolve an overdue match by walkover.
    ///
    /// Returns `None` if the match was already resolved.
    pub async fn resolve_walkover(&self, match_id: MatchId) -> TournamentResult<Option<TournamentMatch>> {
        let repo = &self.ctx.tournaments;
        let ctx = &self.ctx;

        let resolved = self
            .ctx
            .retry_on_conflict("walkover", || async move {
                let m = repo.get_match(match_id).await?;
                if m.is_resolved() {
                    return Ok(None);
                }
                let tournament = repo.get_tournament_header(m.tournament_id).await?;
                if tournament.status != TournamentStatus::Active {
                    return Err(TournamentError::TournamentClosed(tournament.id));
                }
                let (winner, resolution) = scheduler::walkover_decision(&m);
                let mut next = m.clone();
                next.complete(winner, resolution, ctx.now());
                repo.update_match(&next).await.map(Some)
            })
            .await?;

        if let Some(m) = &resolved {
            log::info!(
                "Match {} resolved by {} (winner {:?})",
                m.id,
                m.resolution.map_or("walkover", |r| r.as_str()),
                m.winner_id
            );
            self.propagate(m.tournament_id, m.clone()).await?;
        }
        Ok(resolved)
    }

    /// Push a resolved match's winner forward and settle every match that
    /// became unplayable as a result.
    pub async fn propagate(
        &self,
        tournament_id: TournamentId,
        resolved: TournamentMatch,
    ) -> TournamentResult<()> {
        let mut pending = vec![resolved];
        while let Some(m) = pending.pop() {
            let Some(target) = bracket::promotion_target(m.round, m.slot) else {
                continue;
            };
            let (target_match, seated) = match m.winner() {
                Some(winner) => self.promote(tournament_id, target, winner).await?,
                None => (
                    self.match_at(tournament_id, target.round, target.slot).await?,
                    false,
                ),
            };
            // Decided by a concession the moment the winner was seated
            if seated && target_match.is_resolved() {
                pending.push(target_match);
                continue;
            }
            if let Some(settled) = self.settle_if_unplayable(target_match).await? {
                pending.push(settled);
            }
        }
        Ok(())
    }

    async fn match_at(
        &self,
        tournament_id: TournamentId,
        round: u32,
        slot: u32,
    ) -> TournamentResult<TournamentMatch> {
        self.ctx
            .tournaments
            .find_match(tournament_id, round, slot)
            .await?
            .ok_or_else(|| {
                TournamentError::Corrupt(format!(
                    "tournament {tournament_id} has no match at round {round} slot {slot}"
                ))
            })
    }

    /// Seat `winner` at its promotion target; a no-op if already seated there.
    ///
    /// Returns the target as stored and whether this call seated the winner.
    /// If the other seat's player had already conceded, the same write
    /// decides the match for the winner.
    pub async fn promote(
        &self,
        tournament_id: TournamentId,
        target: PromotionTarget,
        winner: &MatchPlayer,
    ) -> TournamentResult<(TournamentMatch, bool)> {
        let repo = &self.ctx.tournaments;
        let ctx = &self.ctx;

        let (seated, changed) = self
            .ctx
            .retry_on_conflict("promotion", || async move {
                let current = self.match_at(tournament_id, target.round, target.slot).await?;
                let mut next = current.clone();
                if !next.seat_player(target.seat, winner.clone(), ctx.now())? {
                    return Ok((current, false));
                }
                bracket::settle_unplayable(&mut next, false, ctx.now());
                Ok((repo.update_match(&next).await?, true))
            })
            .await?;

        if changed {
            log::debug!(
                "Promoted user {} to round {} slot {} as {:?}",
                winner.user_id,
                target.round,
                target.slot,
                target.seat
            );
            if seated.is_resolved() {
                log::info!(
                    "Match {} went to user {} by an earlier concession",
                    seated.id,
                    winner.user_id
                );
            } else if seated.is_playable() {
                self.notify_playable(&seated);
            }
        }
        Ok((seated, changed))
    }

    /// Complete `m` as a bye or void once it can never receive a second player.
    ///
    /// A feeder counts as settled only once its winner is seated here, so a
    /// sibling that resolved but has not promoted yet keeps `m` open.
    pub async fn settle_if_unplayable(
        &self,
        m: TournamentMatch,
    ) -> TournamentResult<Option<TournamentMatch>> {
        if m.is_resolved() || (m.has_both_players() && m.forfeited_by.is_none()) {
            return Ok(None);
        }
        let repo = &self.ctx.tournaments;
        let ctx = &self.ctx;
        let match_id = m.id;

        self.ctx
            .retry_on_conflict("bye settlement", || async move {
                let current = repo.get_match(match_id).await?;
                if current.is_resolved() {
                    return Ok(None);
                }
                let (feeder_round, feeder_slots) = bracket::feeder_slots(current.round, current.slot);
                let mut feeders_settled = true;
                for slot in feeder_slots {
                    if let Some(feeder) = repo
                        .find_match(current.tournament_id, feeder_round, slot)
                        .await?
                    {
                        feeders_settled &= bracket::feeder_settled(&current, &feeder);
                    }
                }
                let mut next = current.clone();
                if !bracket::settle_unplayable(&mut next, feeders_settled, ctx.now()) {
                    return Ok(None);
                }
                repo.update_match(&next).await.map(Some)
            })
            .await
    }

    /// Advance `current_round` while the active round is fully resolved.
    ///
    /// Completes the tournament when the final is resolved.
    pub async fn advance_rounds(&self, tournament_id: TournamentId) -> TournamentResult<AdvanceOutcome> {
        let repo = &self.ctx.tournaments;
        let mut outcome = AdvanceOutcome::default();
        let mut conflicts = 0;

        loop {
            let tournament = repo.get_tournament_header(tournament_id).await?;
            if tournament.status != TournamentStatus::Active {
                return Ok(outcome);
            }
            let round = tournament.current_round;
            let matches = repo.round_matches(tournament_id, round).await?;
            if matches.is_empty() || !matches.iter().all(TournamentMatch::is_resolved) {
                return Ok(outcome);
            }

            if round <= 2 {
                let champion_id = matches.first().and_then(|m| m.winner_id);
                outcome.completed = self.finish(&tournament, champion_id).await?;
                return Ok(outcome);
            }

            // Promotions are idempotent; redo them in case an earlier writer
            // stopped between resolving a match and promoting its winner.
            for m in &matches {
                self.propagate(tournament_id, m.clone()).await?;
            }

            let next_round = round / 2;
            match repo
                .advance_round(tournament_id, round, next_round, tournament.version, self.ctx.now())
                .await
            {
                Ok(()) => {
                    outcome.rounds_advanced += 1;
                    log::info!(
                        "Tournament {} advanced from {} to {}",
                        tournament_id,
                        scheduler::round_label(round),
                        scheduler::round_label(next_round)
                    );
                    self.ctx.notify(BracketEvent::RoundAdvanced {
                        tournament_id,
                        from_round: round,
                        to_round: next_round,
                    });
                }
                Err(e) if e.is_conflict() && conflicts + 1 < self.ctx.config.max_cas_retries => {
                    conflicts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Crown the champion and pay out. Returns whether this call completed it.
    async fn finish(&self, tournament: &Tournament, champion_id: Option<UserId>) -> TournamentResult<bool> {
        let repo = &self.ctx.tournaments;
        let ctx = &self.ctx;
        let id = tournament.id;

        let completed = self
            .ctx
            .retry_on_conflict("tournament completion", || async move {
                let current = repo.get_tournament_header(id).await?;
                if current.status == TournamentStatus::Completed {
                    return Ok(false);
                }
                match repo
                    .complete_tournament(id, champion_id, false, current.version, ctx.now())
                    .await
                {
                    Ok(()) => Ok(true),
                    // Completed by a concurrent writer
                    Err(TournamentError::TournamentClosed(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            })
            .await?;

        if completed {
            log::info!("Tournament {id} completed, champion {champion_id:?}");
            self.ctx.notify(BracketEvent::TournamentCompleted {
                tournament_id: id,
                champion_id,
            });
            // A failed payout is retried by the next scheduler tick.
            if let Err(e) = self.pay_rewards(id).await {
                log::error!("Reward payout for tournament {id} failed: {e}");
            }
        }
        Ok(completed)
    }

    /// Credit every placement of a completed tournament.
    ///
    /// Credits carry idempotency keys, so calling this again after a partial
    /// failure pays only what is missing. Returns the number of new credits.
    pub async fn pay_rewards(&self, tournament_id: TournamentId) -> TournamentResult<usize> {
        let tournament = self.ctx.tournaments.get_tournament(tournament_id).await?;
        if tournament.status != TournamentStatus::Completed
            || tournament.aborted
            || tournament.rewards_paid
        {
            return Ok(0);
        }

        let mut credited = 0;
        for (user_id, kind) in placements(&tournament) {
            let amount = tournament.rewards.amount_for(kind);
            if amount <= 0 {
                continue;
            }
            let credit = RewardCredit::new(tournament_id, user_id, kind, amount);
            if let CreditOutcome::Credited { .. } = self.ctx.profiles.credit_reward(&credit).await? {
                credited += 1;
            }
        }

        self.ctx.tournaments.mark_rewards_paid(tournament_id).await?;
        log::info!("Paid {credited} rewards for tournament {tournament_id}");
        Ok(credited)
    }

    pub(crate) fn notify_playable(&self, m: &TournamentMatch) {
        if let (Some(p1), Some(p2)) = (&m.player1, &m.player2) {
            self.ctx.notify(BracketEvent::MatchPlayable {
                tournament_id: m.tournament_id,
                match_id: m.id,
                round: m.round,
                player1_id: p1.user_id,
                player2_id: p2.user_id,
            });
        }
    }
}
