//! Round deadlines and the periodic scheduler sweep.
//!
//! All rounds share the tournament's round duration, so the deadline of a
//! round is the start date plus one duration per round played before it,
//! plus its own.

use super::bracket::{self, Bracket};
use super::builder::BracketBuilder;
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    Resolution, Seat, Tournament, TournamentId, TournamentMatch, TournamentStatus, UserId,
};
use super::resolver::MatchResolver;
use super::scoring::{self, Aggregate};
use crate::notify::BracketEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rounds played before `round` in a bracket of `max_participants`
pub fn cumulative_round_index(max_participants: u32, round: u32) -> u32 {
    bracket::round_index(max_participants, round)
}

/// Instant after which legs of `round` are no longer accepted
pub fn round_deadline(tournament: &Tournament, round: u32) -> DateTime<Utc> {
    let index = cumulative_round_index(tournament.max_participants, round) as i32;
    let duration = tournament.round_duration();
    tournament.start_date + duration * index + duration
}

/// Display name of a round
pub fn round_label(round: u32) -> String {
    match round {
        2 => "Final".to_string(),
        4 => "Semifinal".to_string(),
        8 => "Quarterfinal".to_string(),
        n => format!("Round of {n}"),
    }
}

pub fn is_round_overdue(tournament: &Tournament, round: u32, now: DateTime<Utc>) -> bool {
    now > round_deadline(tournament, round)
}

/// Schedule entry of one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSchedule {
    pub round: u32,
    pub label: String,
    pub deadline: DateTime<Utc>,
}

/// Every round of a tournament with its label and deadline
pub fn round_schedule(tournament: &Tournament) -> Vec<RoundSchedule> {
    bracket::rounds(tournament.max_participants)
        .map(|round| RoundSchedule {
            round,
            label: round_label(round),
            deadline: round_deadline(tournament, round),
        })
        .collect()
}

/// Winner and resolution of a match whose deadline passed.
///
/// With both players seated the match is a walkover: whoever submitted wins,
/// partial legs are compared on aggregate if both submitted, and player 1
/// advances if nobody did. A single seated player gets a bye; an empty match
/// is void. A player who conceded never advances.
pub fn walkover_decision(m: &TournamentMatch) -> (Option<UserId>, Resolution) {
    let conceded = m.forfeited_by;
    let (p1, p2) = match (&m.player1, &m.player2) {
        (Some(p1), Some(p2)) => (p1, p2),
        (Some(p), None) | (None, Some(p)) if conceded == Some(p.user_id) => {
            return (None, Resolution::Void);
        }
        (Some(p), None) | (None, Some(p)) => return (Some(p.user_id), Resolution::Bye),
        (None, None) => return (None, Resolution::Void),
    };
    if let Some(quitter) = conceded {
        let winner = if p1.user_id == quitter { p2 } else { p1 };
        return (Some(winner.user_id), Resolution::Forfeit);
    }

    let seat = match (m.player1_legs.submitted(), m.player2_legs.submitted()) {
        (_, 0) => Seat::Player1,
        (0, _) => Seat::Player2,
        _ => {
            scoring::compare(
                &Aggregate::of(&m.player1_legs),
                &Aggregate::of(&m.player2_legs),
            )
            .0
        }
    };
    let winner = match seat {
        Seat::Player1 => p1.user_id,
        Seat::Player2 => p2.user_id,
    };
    (Some(winner), Resolution::Walkover)
}

/// Counters of one scheduler sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tournaments_checked: usize,
    pub started: usize,
    pub closed_without_players: usize,
    pub walkovers: usize,
    pub rounds_advanced: usize,
    pub completed: usize,
    pub rewards_paid: usize,
    pub failures: usize,
}

/// How a start attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Bracket),
    /// Fewer than two participants; the tournament was closed
    ClosedWithoutPlayers,
}

/// Drives time-based transitions
#[derive(Clone)]
pub struct RoundScheduler {
    resolver: MatchResolver,
}

impl RoundScheduler {
    pub fn new(resolver: MatchResolver) -> Self {
        Self { resolver }
    }

    /// Build the bracket and move the tournament to `active`.
    ///
    /// Runs once per tournament: activation is a CAS on the registration
    /// state, so a concurrent start sees `InvalidState`.
    pub async fn start_tournament(&self, id: TournamentId) -> TournamentResult<StartOutcome> {
        let ctx = self.resolver.context();
        let repo = &ctx.tournaments;

        let outcome = ctx
            .retry_on_conflict("tournament start", || async move {
                let tournament = repo.get_tournament_header(id).await?;
                if tournament.status != TournamentStatus::Registration {
                    return Err(TournamentError::InvalidState {
                        expected: TournamentStatus::Registration,
                        actual: tournament.status,
                    });
                }
                let now = ctx.now();
                if tournament.participants.len() < 2 {
                    repo.complete_tournament(id, None, true, tournament.version, now)
                        .await?;
                    return Ok(StartOutcome::ClosedWithoutPlayers);
                }

                let bracket = BracketBuilder::new(id, tournament.max_participants)?
                    .build(&tournament.participants, now)?;
                repo.activate(id, tournament.version, bracket.matches(), now)
                    .await?;
                Ok(StartOutcome::Started(bracket))
            })
            .await?;

        match &outcome {
            StartOutcome::Started(bracket) => {
                log::info!(
                    "Tournament {} started with a bracket of {}",
                    id,
                    bracket.size()
                );
                for m in bracket.matches().iter().filter(|m| m.is_playable()) {
                    self.resolver.notify_playable(m);
                }
                self.resolver.advance_rounds(id).await?;
            }
            StartOutcome::ClosedWithoutPlayers => {
                log::warn!("Tournament {id} closed: fewer than 2 participants at start");
                ctx.notify(BracketEvent::TournamentCompleted {
                    tournament_id: id,
                    champion_id: None,
                });
            }
        }
        Ok(outcome)
    }

    /// One sweep over every tournament that may need a transition.
    ///
    /// Failures are counted and logged per tournament and never stop the
    /// sweep. Running it twice on unchanged state changes nothing.
    pub async fn tick(&self) -> TournamentResult<TickReport> {
        let ctx = self.resolver.context();
        let now = ctx.now();
        let candidates = ctx.tournaments.tick_candidates(now).await?;

        let mut report = TickReport::default();
        for tournament in candidates {
            report.tournaments_checked += 1;
            if let Err(e) = self.tick_tournament(&tournament, now, &mut report).await {
                report.failures += 1;
                log::error!("Scheduler tick failed for tournament {}: {}", tournament.id, e);
            }
        }

        if report != TickReport::default() {
            log::debug!("Scheduler tick: {report:?}");
        }
        Ok(report)
    }

    async fn tick_tournament(
        &self,
        tournament: &Tournament,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> TournamentResult<()> {
        let id = tournament.id;
        match tournament.status {
            TournamentStatus::Registration if tournament.start_date <= now => {
                match self.start_tournament(id).await {
                    Ok(StartOutcome::Started(_)) => report.started += 1,
                    Ok(StartOutcome::ClosedWithoutPlayers) => {
                        report.closed_without_players += 1;
                        return Ok(());
                    }
                    // Started or closed by another sweep
                    Err(TournamentError::InvalidState { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            TournamentStatus::Registration => return Ok(()),
            TournamentStatus::Completed => {
                report.rewards_paid += self.resolver.pay_rewards(id).await?;
                return Ok(());
            }
            TournamentStatus::Active => {}
        }

        self.sweep_active(id, now, report).await
    }

    /// Resolve overdue rounds and advance until nothing is left to do
    async fn sweep_active(
        &self,
        id: TournamentId,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> TournamentResult<()> {
        let repo = &self.resolver.context().tournaments;
        let outcome = self.resolver.advance_rounds(id).await?;
        report.rounds_advanced += outcome.rounds_advanced;
        if outcome.completed {
            report.completed += 1;
            return Ok(());
        }

        loop {
            let tournament = repo.get_tournament_header(id).await?;
            if tournament.status != TournamentStatus::Active {
                return Ok(());
            }
            let round = tournament.current_round;
            if !is_round_overdue(&tournament, round, now) {
                return Ok(());
            }

            for m in repo.round_matches(id, round).await? {
                if m.is_resolved() {
                    continue;
                }
                if let Some(resolved) = self.resolver.resolve_walkover(m.id).await? {
                    if resolved.resolution == Some(Resolution::Walkover) {
                        report.walkovers += 1;
                    }
                }
            }

            let outcome = self.resolver.advance_rounds(id).await?;
            report.rounds_advanced += outcome.rounds_advanced;
            if outcome.completed {
                report.completed += 1;
                return Ok(());
            }
            if outcome.rounds_advanced == 0 {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{
        Difficulty, LegScore, MatchPlayer, QuizConfig, Rewards,
    };
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 15, 0, 0).unwrap()
    }

    fn tournament(max_participants: u32, minutes: u32) -> Tournament {
        Tournament {
            id: 1,
            title: "t".to_string(),
            grade: "2".to_string(),
            unit_id: "u".to_string(),
            status: TournamentStatus::Active,
            registration_opens_at: t0() - Duration::days(1),
            registration_closes_at: t0(),
            start_date: t0(),
            round_duration_minutes: minutes,
            participants: Vec::new(),
            matches: Vec::new(),
            current_round: max_participants,
            champion_id: None,
            max_participants,
            min_level: 0,
            rewards: Rewards::default(),
            config: QuizConfig {
                difficulty: Difficulty::Medium,
                word_count: 10,
            },
            aborted: false,
            rewards_paid: false,
            version: 0,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn seated() -> TournamentMatch {
        let mut m = TournamentMatch::new(1, 8, 0, t0());
        m.player1 = Some(MatchPlayer {
            user_id: 1,
            display_name: "a".to_string(),
        });
        m.player2 = Some(MatchPlayer {
            user_id: 2,
            display_name: "b".to_string(),
        });
        m
    }

    #[test]
    fn test_eight_player_deadlines() {
        let t = tournament(8, 30);
        assert_eq!(round_deadline(&t, 8), t0() + Duration::minutes(30));
        assert_eq!(round_deadline(&t, 4), t0() + Duration::minutes(60));
        assert_eq!(round_deadline(&t, 2), t0() + Duration::minutes(90));
    }

    #[test]
    fn test_deadlines_increase_toward_final() {
        let t = tournament(1024, 7);
        let schedule = round_schedule(&t);
        assert_eq!(schedule.len(), 10);
        assert!(schedule.windows(2).all(|w| w[0].deadline < w[1].deadline));
        assert_eq!(schedule.last().map(|s| s.label.as_str()), Some("Final"));
    }

    #[test]
    fn test_round_labels() {
        assert_eq!(round_label(2), "Final");
        assert_eq!(round_label(4), "Semifinal");
        assert_eq!(round_label(8), "Quarterfinal");
        assert_eq!(round_label(16), "Round of 16");
        assert_eq!(round_label(256), "Round of 256");
    }

    #[test]
    fn test_overdue_is_strictly_after_deadline() {
        let t = tournament(4, 10);
        let deadline = round_deadline(&t, 4);
        assert!(!is_round_overdue(&t, 4, deadline));
        assert!(is_round_overdue(&t, 4, deadline + Duration::seconds(1)));
    }

    #[test]
    fn test_walkover_nobody_played_goes_to_player1() {
        assert_eq!(walkover_decision(&seated()), (Some(1), Resolution::Walkover));
    }

    #[test]
    fn test_walkover_only_submitter_wins() {
        let mut m = seated();
        m.record_leg(Seat::Player2, LegScore::new(1, 90_000), t0())
            .unwrap();
        assert_eq!(walkover_decision(&m), (Some(2), Resolution::Walkover));
    }

    #[test]
    fn test_walkover_compares_partial_legs() {
        let mut m = seated();
        m.record_leg(Seat::Player1, LegScore::new(6, 10_000), t0())
            .unwrap();
        m.record_leg(Seat::Player2, LegScore::new(4, 10_000), t0())
            .unwrap();
        m.record_leg(Seat::Player2, LegScore::new(5, 10_000), t0())
            .unwrap();
        // 6 vs 9
        assert_eq!(walkover_decision(&m), (Some(2), Resolution::Walkover));
    }

    #[test]
    fn test_walkover_single_player_is_bye() {
        let mut m = seated();
        m.player1 = None;
        assert_eq!(walkover_decision(&m), (Some(2), Resolution::Bye));
        m.player2 = None;
        assert_eq!(walkover_decision(&m), (None, Resolution::Void));
    }

    #[test]
    fn test_walkover_never_advances_a_quitter() {
        let mut m = seated();
        m.forfeited_by = Some(1);
        assert_eq!(walkover_decision(&m), (Some(2), Resolution::Forfeit));
        m.player2 = None;
        assert_eq!(walkover_decision(&m), (None, Resolution::Void));
    }
}
