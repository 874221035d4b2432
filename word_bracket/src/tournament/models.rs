//! Tournament and match data models.

use super::errors::ValidationError;
use super::scoring;
use crate::rewards::RewardKind;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tournament ID type
pub type TournamentId = i64;

/// Match ID type
pub type MatchId = Uuid;

/// User ID type
pub type UserId = i64;

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting registrations
    Registration,
    /// Bracket built, matches in play
    Active,
    /// Champion crowned or aborted
    Completed,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Registration => "registration",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "registration" => Some(TournamentStatus::Registration),
            "active" => Some(TournamentStatus::Active),
            "completed" => Some(TournamentStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quiz difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Smallest allowed word count per quiz
pub const MIN_WORD_COUNT: u32 = 5;

/// Largest allowed word count per quiz
pub const MAX_WORD_COUNT: u32 = 50;

/// Quiz settings every leg of the tournament is played with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizConfig {
    pub difficulty: Difficulty,
    pub word_count: u32,
}

impl QuizConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&self.word_count) {
            return Err(ValidationError::InvalidField {
                field: "word_count",
                reason: format!("must be between {MIN_WORD_COUNT} and {MAX_WORD_COUNT}"),
            });
        }
        Ok(())
    }
}

/// Reward amounts credited when a tournament completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rewards {
    pub first: i64,
    pub second: i64,
    pub third: i64,
    pub participation: i64,
}

impl Rewards {
    /// Amount credited for a placement
    pub fn amount_for(&self, kind: RewardKind) -> i64 {
        match kind {
            RewardKind::First => self.first,
            RewardKind::Second => self.second,
            RewardKind::Third => self.third,
            RewardKind::Participation => self.participation,
        }
    }
}

/// Registered participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub display_name: String,
    pub level: u32,
    pub registered_at: DateTime<Utc>,
}

/// Player seated in a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub user_id: UserId,
    pub display_name: String,
}

impl From<&Participant> for MatchPlayer {
    fn from(participant: &Participant) -> Self {
        Self {
            user_id: participant.user_id,
            display_name: participant.display_name.clone(),
        }
    }
}

/// Highest score a single leg may report
pub const MAX_LEG_SCORE: i64 = 1_000_000;

/// Longest a single leg may take: one day
pub const MAX_LEG_ELAPSED_MS: i64 = 86_400_000;

/// Score of one play-through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegScore {
    pub score: i64,
    /// Time taken in milliseconds
    pub elapsed_ms: i64,
}

impl LegScore {
    pub fn new(score: i64, elapsed_ms: i64) -> Self {
        Self { score, elapsed_ms }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.score < 0 || self.elapsed_ms < 0 {
            return Err(ValidationError::NegativeScore);
        }
        if self.score > MAX_LEG_SCORE || self.elapsed_ms > MAX_LEG_ELAPSED_MS {
            return Err(ValidationError::LegOutOfRange {
                max_score: MAX_LEG_SCORE,
                max_elapsed_ms: MAX_LEG_ELAPSED_MS,
            });
        }
        Ok(())
    }
}

/// Legs submitted by one player of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerLegs {
    pub leg1: Option<LegScore>,
    pub leg2: Option<LegScore>,
}

impl PlayerLegs {
    /// Number of legs submitted
    pub fn submitted(&self) -> usize {
        usize::from(self.leg1.is_some()) + usize::from(self.leg2.is_some())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LegScore> {
        self.leg1.iter().chain(self.leg2.iter())
    }
}

/// Match progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    Leg1Active,
    Leg2Active,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Waiting => "waiting",
            MatchStatus::Leg1Active => "leg1_active",
            MatchStatus::Leg2Active => "leg2_active",
            MatchStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "waiting" => Some(MatchStatus::Waiting),
            "leg1_active" => Some(MatchStatus::Leg1Active),
            "leg2_active" => Some(MatchStatus::Leg2Active),
            "completed" => Some(MatchStatus::Completed),
            _ => None,
        }
    }
}

/// How a completed match was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// All required legs were played
    Played,
    /// Only one player could ever be seated
    Bye,
    /// Round deadline passed with legs missing
    Walkover,
    /// A player conceded
    Forfeit,
    /// Nobody could be seated
    Void,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Played => "played",
            Resolution::Bye => "bye",
            Resolution::Walkover => "walkover",
            Resolution::Forfeit => "forfeit",
            Resolution::Void => "void",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "played" => Some(Resolution::Played),
            "bye" => Some(Resolution::Bye),
            "walkover" => Some(Resolution::Walkover),
            "forfeit" => Some(Resolution::Forfeit),
            "void" => Some(Resolution::Void),
            _ => None,
        }
    }
}

/// Player position within a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    Player1,
    Player2,
}

impl Seat {
    /// Seat a feeder slot promotes into: even slots feed player 1
    pub fn for_feeder_slot(slot: u32) -> Self {
        if slot % 2 == 0 {
            Seat::Player1
        } else {
            Seat::Player2
        }
    }

    pub fn other(self) -> Self {
        match self {
            Seat::Player1 => Seat::Player2,
            Seat::Player2 => Seat::Player1,
        }
    }
}

/// One node of the bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentMatch {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// Players remaining entering this round (8 = quarterfinal, 2 = final)
    pub round: u32,
    /// Index of the match within its round
    pub slot: u32,
    pub player1: Option<MatchPlayer>,
    pub player2: Option<MatchPlayer>,
    pub player1_legs: PlayerLegs,
    pub player2_legs: PlayerLegs,
    pub winner_id: Option<UserId>,
    pub status: MatchStatus,
    pub resolution: Option<Resolution>,
    /// Player who conceded; set before an opponent arrives, the match goes to
    /// whoever is promoted into the other seat
    #[serde(default)]
    pub forfeited_by: Option<UserId>,
    /// Compare-and-swap token, bumped on every persisted write
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl TournamentMatch {
    /// Create an empty match skeleton
    pub fn new(tournament_id: TournamentId, round: u32, slot: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            round,
            slot,
            player1: None,
            player2: None,
            player1_legs: PlayerLegs::default(),
            player2_legs: PlayerLegs::default(),
            winner_id: None,
            status: MatchStatus::Waiting,
            resolution: None,
            forfeited_by: None,
            version: 0,
            updated_at: now,
        }
    }

    pub fn is_final(&self) -> bool {
        self.round == 2
    }

    /// Legs each player must submit
    pub fn legs_required(&self) -> usize {
        if self.is_final() { 1 } else { 2 }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    pub fn has_both_players(&self) -> bool {
        self.player1.is_some() && self.player2.is_some()
    }

    /// Both players seated and the match not yet decided
    pub fn is_playable(&self) -> bool {
        self.has_both_players() && !self.is_resolved()
    }

    pub fn player(&self, seat: Seat) -> Option<&MatchPlayer> {
        match seat {
            Seat::Player1 => self.player1.as_ref(),
            Seat::Player2 => self.player2.as_ref(),
        }
    }

    pub fn legs(&self, seat: Seat) -> &PlayerLegs {
        match seat {
            Seat::Player1 => &self.player1_legs,
            Seat::Player2 => &self.player2_legs,
        }
    }

    fn legs_mut(&mut self, seat: Seat) -> &mut PlayerLegs {
        match seat {
            Seat::Player1 => &mut self.player1_legs,
            Seat::Player2 => &mut self.player2_legs,
        }
    }

    /// Seat occupied by `user_id`, if any
    pub fn seat_of(&self, user_id: UserId) -> Option<Seat> {
        if self.player1.as_ref().is_some_and(|p| p.user_id == user_id) {
            Some(Seat::Player1)
        } else if self.player2.as_ref().is_some_and(|p| p.user_id == user_id) {
            Some(Seat::Player2)
        } else {
            None
        }
    }

    /// Seated players' ids
    pub fn player_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.player1
            .iter()
            .chain(self.player2.iter())
            .map(|p| p.user_id)
    }

    pub fn winner(&self) -> Option<&MatchPlayer> {
        let winner_id = self.winner_id?;
        self.seat_of(winner_id).and_then(|seat| self.player(seat))
    }

    /// Seated player who did not win a resolved match
    pub fn loser_id(&self) -> Option<UserId> {
        let winner_id = self.winner_id?;
        self.player_ids().find(|id| *id != winner_id)
    }

    fn has_all_legs(&self) -> bool {
        let required = self.legs_required();
        self.player1_legs.submitted() >= required && self.player2_legs.submitted() >= required
    }

    /// Status implied by the legs on record
    fn status_from_legs(&self) -> MatchStatus {
        let both_leg1 = self.player1_legs.leg1.is_some() && self.player2_legs.leg1.is_some();
        if both_leg1 && !self.is_final() {
            MatchStatus::Leg2Active
        } else if self.player1_legs.leg1.is_some() || self.player2_legs.leg1.is_some() {
            MatchStatus::Leg1Active
        } else {
            MatchStatus::Waiting
        }
    }

    /// Write a leg into the next open slot for `seat`.
    ///
    /// Leg 2 opens only once both players have played leg 1. When the last
    /// required leg lands the match is decided on aggregate and completed.
    /// Returns whether the match completed.
    pub fn record_leg(
        &mut self,
        seat: Seat,
        leg: LegScore,
        now: DateTime<Utc>,
    ) -> Result<bool, ValidationError> {
        if self.is_resolved() {
            return Err(ValidationError::MatchResolved(self.id));
        }
        if !self.has_both_players() {
            return Err(ValidationError::MatchNotReady(self.id));
        }
        let user_id = self
            .player(seat)
            .map(|p| p.user_id)
            .ok_or(ValidationError::MatchNotReady(self.id))?;

        let required = self.legs_required();
        let status = self.status;
        let legs = self.legs_mut(seat);
        if legs.leg1.is_none() {
            legs.leg1 = Some(leg);
        } else if required == 2 && legs.leg2.is_none() {
            if status != MatchStatus::Leg2Active {
                return Err(ValidationError::LegNotOpen { user_id, leg: 2 });
            }
            legs.leg2 = Some(leg);
        } else {
            return Err(ValidationError::LegsComplete(user_id));
        }

        self.updated_at = now;
        if self.has_all_legs() {
            let decision = scoring::decide(self);
            self.complete(decision.map(|d| d.winner_id), Resolution::Played, now);
            Ok(true)
        } else {
            self.status = self.status_from_legs();
            Ok(false)
        }
    }

    /// Seat a promoted player.
    ///
    /// Re-seating the same user is a no-op; returns whether anything changed.
    /// A resolved match takes no new players.
    pub fn seat_player(
        &mut self,
        seat: Seat,
        player: MatchPlayer,
        now: DateTime<Utc>,
    ) -> Result<bool, ValidationError> {
        let resolved = self.is_resolved();
        let id = self.id;
        let slot = match seat {
            Seat::Player1 => &mut self.player1,
            Seat::Player2 => &mut self.player2,
        };
        match slot {
            Some(existing) if existing.user_id == player.user_id => Ok(false),
            Some(existing) => Err(ValidationError::SlotOccupied {
                round: self.round,
                slot: self.slot,
                occupant: existing.user_id,
            }),
            None if resolved => Err(ValidationError::MatchResolved(id)),
            None => {
                *slot = Some(player);
                self.updated_at = now;
                Ok(true)
            }
        }
    }

    /// Mark the match decided
    pub fn complete(
        &mut self,
        winner_id: Option<UserId>,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) {
        self.winner_id = winner_id;
        self.resolution = Some(resolution);
        self.status = MatchStatus::Completed;
        self.updated_at = now;
    }
}

/// Tournament as persisted.
///
/// Loaders that only need scheduling state return it with `matches` empty;
/// [`crate::db::TournamentRepository::get_tournament`] always fills it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub title: String,
    pub grade: String,
    pub unit_id: String,
    pub status: TournamentStatus,
    pub registration_opens_at: DateTime<Utc>,
    pub registration_closes_at: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub round_duration_minutes: u32,
    /// Registration order
    pub participants: Vec<Participant>,
    pub matches: Vec<TournamentMatch>,
    /// Players remaining entering the active round
    pub current_round: u32,
    pub champion_id: Option<UserId>,
    pub max_participants: u32,
    pub min_level: u32,
    pub rewards: Rewards,
    pub config: QuizConfig,
    /// Closed by an administrator or for lack of players
    pub aborted: bool,
    pub rewards_paid: bool,
    /// Compare-and-swap token for tournament-level writes
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    pub fn round_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.round_duration_minutes))
    }

    pub fn participant(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participant(user_id).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants as usize
    }

    pub fn matches_in_round(&self, round: u32) -> impl Iterator<Item = &TournamentMatch> {
        self.matches.iter().filter(move |m| m.round == round)
    }

    pub fn final_match(&self) -> Option<&TournamentMatch> {
        self.matches.iter().find(|m| m.is_final())
    }

    pub fn summary(&self) -> TournamentSummary {
        TournamentSummary {
            id: self.id,
            title: self.title.clone(),
            grade: self.grade.clone(),
            unit_id: self.unit_id.clone(),
            status: self.status,
            participant_count: self.participants.len(),
            max_participants: self.max_participants,
            current_round: self.current_round,
            champion_id: self.champion_id,
            start_date: self.start_date,
        }
    }
}

/// Listing view of a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentSummary {
    pub id: TournamentId,
    pub title: String,
    pub grade: String,
    pub unit_id: String,
    pub status: TournamentStatus,
    pub participant_count: usize,
    pub max_participants: u32,
    pub current_round: u32,
    pub champion_id: Option<UserId>,
    pub start_date: DateTime<Utc>,
}

/// Tournament creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    pub title: String,
    pub grade: String,
    pub unit_id: String,
    pub registration_opens_at: DateTime<Utc>,
    pub registration_closes_at: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub round_duration_minutes: u32,
    pub max_participants: u32,
    pub min_level: u32,
    pub rewards: Rewards,
    pub config: QuizConfig,
}

impl NewTournament {
    pub fn validate(&self) -> Result<(), ValidationError> {
        super::bracket::validate_bracket_size(self.max_participants)?;
        self.config.validate()?;

        if self.title.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "title",
                reason: "must not be empty".to_string(),
            });
        }
        if self.unit_id.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "unit_id",
                reason: "must not be empty".to_string(),
            });
        }
        if self.round_duration_minutes == 0 {
            return Err(ValidationError::InvalidField {
                field: "round_duration_minutes",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.registration_opens_at >= self.registration_closes_at {
            return Err(ValidationError::InvalidField {
                field: "registration_closes_at",
                reason: "must be after registration opens".to_string(),
            });
        }
        if self.registration_closes_at > self.start_date {
            return Err(ValidationError::InvalidField {
                field: "start_date",
                reason: "must not precede the end of registration".to_string(),
            });
        }
        let rewards = &self.rewards;
        if [rewards.first, rewards.second, rewards.third, rewards.participation]
            .iter()
            .any(|amount| *amount < 0)
        {
            return Err(ValidationError::InvalidField {
                field: "rewards",
                reason: "amounts must be non-negative".to_string(),
            });
        }
        Ok(())
    }

    /// Materialize the tournament record in `registration`
    pub fn into_tournament(self, id: TournamentId, now: DateTime<Utc>) -> Tournament {
        Tournament {
            id,
            title: self.title,
            grade: self.grade,
            unit_id: self.unit_id,
            status: TournamentStatus::Registration,
            registration_opens_at: self.registration_opens_at,
            registration_closes_at: self.registration_closes_at,
            start_date: self.start_date,
            round_duration_minutes: self.round_duration_minutes,
            participants: Vec::new(),
            matches: Vec::new(),
            current_round: self.max_participants,
            champion_id: None,
            max_participants: self.max_participants,
            min_level: self.min_level,
            rewards: self.rewards,
            config: self.config,
            aborted: false,
            rewards_paid: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn player(id: UserId) -> MatchPlayer {
        MatchPlayer {
            user_id: id,
            display_name: format!("user{id}"),
        }
    }

    fn seated(round: u32) -> TournamentMatch {
        let mut m = TournamentMatch::new(1, round, 0, t0());
        m.player1 = Some(player(1));
        m.player2 = Some(player(2));
        m
    }

    #[test]
    fn test_status_progression_two_legs() {
        let mut m = seated(8);
        assert_eq!(m.status, MatchStatus::Waiting);

        assert!(!m.record_leg(Seat::Player1, LegScore::new(10, 60_000), t0()).unwrap());
        assert_eq!(m.status, MatchStatus::Leg1Active);

        assert!(!m.record_leg(Seat::Player2, LegScore::new(9, 70_000), t0()).unwrap());
        assert_eq!(m.status, MatchStatus::Leg2Active);

        assert!(!m.record_leg(Seat::Player2, LegScore::new(9, 80_000), t0()).unwrap());
        assert_eq!(m.status, MatchStatus::Leg2Active);

        assert!(m.record_leg(Seat::Player1, LegScore::new(8, 60_000), t0()).unwrap());
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.resolution, Some(Resolution::Played));
        // 18 vs 18, 120s vs 150s
        assert_eq!(m.winner_id, Some(1));
        assert_eq!(m.loser_id(), Some(2));
    }

    #[test]
    fn test_leg2_not_open_until_both_leg1() {
        let mut m = seated(4);
        m.record_leg(Seat::Player1, LegScore::new(5, 1_000), t0())
            .unwrap();
        let err = m
            .record_leg(Seat::Player1, LegScore::new(5, 1_000), t0())
            .unwrap_err();
        assert_eq!(err, ValidationError::LegNotOpen { user_id: 1, leg: 2 });
    }

    #[test]
    fn test_final_completes_after_single_leg_each() {
        let mut m = seated(2);
        m.record_leg(Seat::Player2, LegScore::new(12, 1_000), t0())
            .unwrap();
        assert_eq!(m.status, MatchStatus::Leg1Active);
        assert!(m.record_leg(Seat::Player1, LegScore::new(11, 500), t0()).unwrap());
        assert_eq!(m.winner_id, Some(2));

        let err = m
            .record_leg(Seat::Player1, LegScore::new(1, 1), t0())
            .unwrap_err();
        assert!(matches!(err, ValidationError::MatchResolved(_)));
    }

    #[test]
    fn test_record_leg_requires_both_players() {
        let mut m = TournamentMatch::new(1, 8, 0, t0());
        m.player1 = Some(player(1));
        let err = m
            .record_leg(Seat::Player1, LegScore::new(1, 1), t0())
            .unwrap_err();
        assert!(matches!(err, ValidationError::MatchNotReady(_)));
    }

    #[test]
    fn test_seat_player_is_idempotent() {
        let mut m = TournamentMatch::new(1, 4, 0, t0());
        assert!(m.seat_player(Seat::Player1, player(3), t0()).unwrap());
        assert!(!m.seat_player(Seat::Player1, player(3), t0()).unwrap());
        let err = m.seat_player(Seat::Player1, player(4), t0()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::SlotOccupied {
                round: 4,
                slot: 0,
                occupant: 3
            }
        );
    }

    #[test]
    fn test_resolved_match_takes_no_new_player() {
        let mut m = TournamentMatch::new(1, 4, 0, t0());
        m.seat_player(Seat::Player1, player(3), t0()).unwrap();
        m.complete(Some(3), Resolution::Bye, t0());

        assert!(!m.seat_player(Seat::Player1, player(3), t0()).unwrap());
        let err = m.seat_player(Seat::Player2, player(4), t0()).unwrap_err();
        assert_eq!(err, ValidationError::MatchResolved(m.id));
        assert!(m.player2.is_none());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            MatchStatus::Waiting,
            MatchStatus::Leg1Active,
            MatchStatus::Leg2Active,
            MatchStatus::Completed,
        ] {
            assert_eq!(MatchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TournamentStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_negative_leg_rejected() {
        assert_eq!(
            LegScore::new(-1, 10).validate(),
            Err(ValidationError::NegativeScore)
        );
        assert!(LegScore::new(0, 0).validate().is_ok());
    }

    #[test]
    fn test_leg_bounds() {
        assert!(LegScore::new(MAX_LEG_SCORE, MAX_LEG_ELAPSED_MS).validate().is_ok());
        let out_of_range = Err(ValidationError::LegOutOfRange {
            max_score: MAX_LEG_SCORE,
            max_elapsed_ms: MAX_LEG_ELAPSED_MS,
        });
        assert_eq!(LegScore::new(MAX_LEG_SCORE + 1, 0).validate(), out_of_range);
        assert_eq!(LegScore::new(0, i64::MAX).validate(), out_of_range);
    }

    #[test]
    fn test_new_tournament_validation() {
        let request = NewTournament {
            title: "Spring Cup".to_string(),
            grade: "5".to_string(),
            unit_id: "unit-3".to_string(),
            registration_opens_at: t0(),
            registration_closes_at: t0() + Duration::days(1),
            start_date: t0() + Duration::days(1),
            round_duration_minutes: 30,
            max_participants: 8,
            min_level: 1,
            rewards: Rewards {
                first: 100,
                second: 50,
                third: 25,
                participation: 5,
            },
            config: QuizConfig {
                difficulty: Difficulty::Medium,
                word_count: 10,
            },
        };
        assert!(request.validate().is_ok());

        let mut bad = request.clone();
        bad.max_participants = 6;
        assert_eq!(
            bad.validate(),
            Err(ValidationError::InvalidBracketSize(6))
        );

        let mut bad = request.clone();
        bad.start_date = t0();
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::InvalidField { field: "start_date", .. })
        ));

        let mut bad = request;
        bad.config.word_count = 500;
        assert!(bad.validate().is_err());
    }
}
