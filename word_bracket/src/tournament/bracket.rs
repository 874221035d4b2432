//! Bracket arena: matches addressed by `(round, slot)`.
//!
//! For a bracket of size `N` the arena holds `N - 1` matches ordered by round
//! (largest first) and slot, so `(round, slot)` lives at index
//! `(N - round) + slot`. The winner of `(R, i)` is promoted to seat `i % 2` of
//! `(R / 2, i / 2)`.

use super::errors::ValidationError;
use super::models::{MatchPlayer, Resolution, Seat, TournamentId, TournamentMatch};
use chrono::{DateTime, Utc};

/// Smallest bracket
pub const MIN_BRACKET_SIZE: u32 = 2;

/// Largest bracket
pub const MAX_BRACKET_SIZE: u32 = 1024;

pub fn validate_bracket_size(size: u32) -> Result<(), ValidationError> {
    if !size.is_power_of_two() || !(MIN_BRACKET_SIZE..=MAX_BRACKET_SIZE).contains(&size) {
        return Err(ValidationError::InvalidBracketSize(size));
    }
    Ok(())
}

/// Round labels from `size` down to the final
pub fn rounds(size: u32) -> impl Iterator<Item = u32> {
    std::iter::successors(Some(size), |r| (*r > 2).then_some(r / 2)).filter(|r| *r >= 2)
}

/// Number of rounds played before `round` starts
pub fn round_index(size: u32, round: u32) -> u32 {
    size.trailing_zeros() - round.trailing_zeros()
}

/// Arena position of `(round, slot)`
pub fn arena_index(size: u32, round: u32, slot: u32) -> usize {
    (size - round + slot) as usize
}

/// Where a match's winner goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionTarget {
    pub round: u32,
    pub slot: u32,
    pub seat: Seat,
}

/// Promotion target of `(round, slot)`; `None` for the final
pub fn promotion_target(round: u32, slot: u32) -> Option<PromotionTarget> {
    (round > 2).then(|| PromotionTarget {
        round: round / 2,
        slot: slot / 2,
        seat: Seat::for_feeder_slot(slot),
    })
}

/// Previous-round slots feeding `(round, slot)`: `(round * 2, [2i, 2i + 1])`
pub fn feeder_slots(round: u32, slot: u32) -> (u32, [u32; 2]) {
    (round * 2, [slot * 2, slot * 2 + 1])
}

/// Whether `feeder` has nothing left to send into `target`: it is resolved
/// and its winner, if any, is already seated there
pub fn feeder_settled(target: &TournamentMatch, feeder: &TournamentMatch) -> bool {
    feeder.is_resolved()
        && feeder
            .winner_id
            .is_none_or(|winner| target.seat_of(winner).is_some())
}

/// Complete a match that can never be played.
///
/// A seated match with a concession goes to the other player. Otherwise,
/// once every feeder is settled, a match holding a single player who has not
/// conceded is a bye for that player and anything else is void. Returns
/// whether it changed.
pub fn settle_unplayable(
    m: &mut TournamentMatch,
    feeders_settled: bool,
    now: DateTime<Utc>,
) -> bool {
    if m.is_resolved() {
        return false;
    }
    let conceded = m.forfeited_by;
    let remaining = m.player_ids().find(|id| Some(*id) != conceded);

    if m.has_both_players() {
        if conceded.is_none() {
            return false;
        }
        m.complete(remaining, Resolution::Forfeit, now);
        return true;
    }
    if !feeders_settled {
        return false;
    }
    match remaining {
        Some(winner) => m.complete(Some(winner), Resolution::Bye, now),
        None => m.complete(None, Resolution::Void, now),
    }
    true
}

/// Complete bracket of one tournament
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bracket {
    size: u32,
    matches: Vec<TournamentMatch>,
}

impl Bracket {
    /// Empty skeleton for every round of a bracket of `size`
    pub fn skeleton(
        tournament_id: TournamentId,
        size: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_bracket_size(size)?;
        let matches = rounds(size)
            .flat_map(|round| {
                (0..round / 2).map(move |slot| TournamentMatch::new(tournament_id, round, slot, now))
            })
            .collect();
        Ok(Self { size, matches })
    }

    /// Rebuild the arena from persisted matches in any order
    pub fn from_matches(
        size: u32,
        mut matches: Vec<TournamentMatch>,
    ) -> Result<Self, ValidationError> {
        validate_bracket_size(size)?;
        if matches.len() != (size - 1) as usize {
            return Err(ValidationError::InvalidField {
                field: "matches",
                reason: format!("expected {} matches, found {}", size - 1, matches.len()),
            });
        }
        matches.sort_by_key(|m| arena_index(size, m.round, m.slot));
        Ok(Self { size, matches })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn in_range(&self, round: u32, slot: u32) -> bool {
        (2..=self.size).contains(&round) && slot < round / 2
    }

    pub fn get(&self, round: u32, slot: u32) -> Option<&TournamentMatch> {
        if !self.in_range(round, slot) {
            return None;
        }
        self.matches
            .get(arena_index(self.size, round, slot))
            .filter(|m| m.round == round && m.slot == slot)
    }

    pub fn get_mut(&mut self, round: u32, slot: u32) -> Option<&mut TournamentMatch> {
        if !self.in_range(round, slot) {
            return None;
        }
        self.matches
            .get_mut(arena_index(self.size, round, slot))
            .filter(|m| m.round == round && m.slot == slot)
    }

    /// Matches of one round in slot order
    pub fn round(&self, round: u32) -> &[TournamentMatch] {
        if round < 2 || round > self.size {
            return &[];
        }
        let start = arena_index(self.size, round, 0);
        self.matches
            .get(start..start + (round / 2) as usize)
            .unwrap_or(&[])
    }

    pub fn matches(&self) -> &[TournamentMatch] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<TournamentMatch> {
        self.matches
    }

    fn feeders_settled(&self, round: u32, slot: u32) -> bool {
        if round == self.size {
            return true;
        }
        let Some(target) = self.get(round, slot) else {
            return false;
        };
        let (feeder_round, feeder_slots) = feeder_slots(round, slot);
        feeder_slots.iter().all(|s| {
            self.get(feeder_round, *s)
                .is_some_and(|feeder| feeder_settled(target, feeder))
        })
    }

    /// Seat `player` at a promotion target
    pub fn promote(
        &mut self,
        target: PromotionTarget,
        player: MatchPlayer,
        now: DateTime<Utc>,
    ) -> Result<bool, ValidationError> {
        let m = self.get_mut(target.round, target.slot).ok_or(
            ValidationError::InvalidField {
                field: "round",
                reason: format!("no match at round {} slot {}", target.round, target.slot),
            },
        )?;
        m.seat_player(target.seat, player, now)
    }

    /// Resolve byes and void matches round by round, promoting bye winners.
    ///
    /// A single pass from the first round down is enough because a match can
    /// only become unplayable after both of its feeders are settled.
    pub fn settle_byes(&mut self, now: DateTime<Utc>) -> Result<usize, ValidationError> {
        let mut settled = 0;
        for round in rounds(self.size).collect::<Vec<_>>() {
            for slot in 0..round / 2 {
                let feeders_settled = self.feeders_settled(round, slot);
                let idx = arena_index(self.size, round, slot);
                if !settle_unplayable(&mut self.matches[idx], feeders_settled, now) {
                    continue;
                }
                settled += 1;
                let winner = self.matches[idx].winner().cloned();
                if let (Some(target), Some(winner)) = (promotion_target(round, slot), winner) {
                    self.promote(target, winner, now)?;
                }
            }
        }
        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_bracket_size_validation() {
        assert!(validate_bracket_size(2).is_ok());
        assert!(validate_bracket_size(1024).is_ok());
        assert!(validate_bracket_size(1).is_err());
        assert!(validate_bracket_size(12).is_err());
        assert!(validate_bracket_size(2048).is_err());
    }

    #[test]
    fn test_rounds_sequence() {
        assert_eq!(rounds(16).collect::<Vec<_>>(), vec![16, 8, 4, 2]);
        assert_eq!(rounds(2).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_round_index() {
        assert_eq!(round_index(32, 32), 0);
        assert_eq!(round_index(32, 16), 1);
        assert_eq!(round_index(32, 2), 4);
    }

    #[test]
    fn test_promotion_targets() {
        assert_eq!(
            promotion_target(8, 3),
            Some(PromotionTarget {
                round: 4,
                slot: 1,
                seat: Seat::Player2
            })
        );
        assert_eq!(
            promotion_target(4, 0),
            Some(PromotionTarget {
                round: 2,
                slot: 0,
                seat: Seat::Player1
            })
        );
        assert_eq!(promotion_target(2, 0), None);
        assert_eq!(feeder_slots(4, 1), (8, [2, 3]));
    }

    #[test]
    fn test_skeleton_layout() {
        let bracket = Bracket::skeleton(1, 8, now()).unwrap();
        assert_eq!(bracket.matches().len(), 7);
        assert_eq!(bracket.round(8).len(), 4);
        assert_eq!(bracket.round(4).len(), 2);
        assert_eq!(bracket.round(2).len(), 1);
        for m in bracket.matches() {
            assert_eq!(bracket.get(m.round, m.slot), Some(m));
        }
    }

    #[test]
    fn test_from_matches_restores_order() {
        let bracket = Bracket::skeleton(1, 4, now()).unwrap();
        let mut shuffled = bracket.clone().into_matches();
        shuffled.reverse();
        assert_eq!(Bracket::from_matches(4, shuffled).unwrap(), bracket);
    }

    #[test]
    fn test_settle_byes_cascades_through_void_matches() {
        let mut bracket = Bracket::skeleton(1, 8, now()).unwrap();
        for (slot, user_id) in [(0u32, 1i64), (1, 2), (2, 3)] {
            bracket.get_mut(8, slot).unwrap().player1 = Some(MatchPlayer {
                user_id,
                display_name: format!("p{user_id}"),
            });
        }
        bracket.get_mut(8, 0).unwrap().player2 = Some(MatchPlayer {
            user_id: 4,
            display_name: "p4".to_string(),
        });

        let settled = bracket.settle_byes(now()).unwrap();
        // (8,1) and (8,2) are byes, (8,3) is void, (4,1) becomes a bye for player 3
        assert_eq!(settled, 4);
        assert_eq!(bracket.get(8, 3).unwrap().resolution, Some(Resolution::Void));
        let semi = bracket.get(4, 1).unwrap();
        assert_eq!(semi.resolution, Some(Resolution::Bye));
        assert_eq!(semi.winner_id, Some(3));
        let final_match = bracket.get(2, 0).unwrap();
        assert_eq!(final_match.player2.as_ref().map(|p| p.user_id), Some(3));
        assert!(final_match.player1.is_none());
        assert!(!final_match.is_resolved());
    }

    fn player(user_id: i64) -> MatchPlayer {
        MatchPlayer {
            user_id,
            display_name: format!("p{user_id}"),
        }
    }

    #[test]
    fn test_feeder_with_unseated_winner_is_not_settled() {
        let mut feeder = TournamentMatch::new(1, 4, 1, now());
        feeder.player1 = Some(player(3));
        feeder.player2 = Some(player(4));
        feeder.complete(Some(3), Resolution::Played, now());

        let mut target = TournamentMatch::new(1, 2, 0, now());
        target.player1 = Some(player(1));
        assert!(!feeder_settled(&target, &feeder));
        assert!(!settle_unplayable(&mut target, false, now()));
        assert!(!target.is_resolved());

        target.player2 = Some(player(3));
        assert!(feeder_settled(&target, &feeder));
        assert!(!settle_unplayable(&mut target, true, now()));
    }

    #[test]
    fn test_concession_decides_once_opponent_arrives() {
        let mut m = TournamentMatch::new(1, 4, 0, now());
        m.player1 = Some(player(1));
        m.forfeited_by = Some(1);
        assert!(!settle_unplayable(&mut m, false, now()));

        m.player2 = Some(player(2));
        assert!(settle_unplayable(&mut m, false, now()));
        assert_eq!(m.winner_id, Some(2));
        assert_eq!(m.resolution, Some(Resolution::Forfeit));
    }

    #[test]
    fn test_concession_with_no_opponent_is_void() {
        let mut m = TournamentMatch::new(1, 4, 0, now());
        m.player2 = Some(player(5));
        m.forfeited_by = Some(5);
        assert!(settle_unplayable(&mut m, true, now()));
        assert_eq!(m.winner_id, None);
        assert_eq!(m.resolution, Some(Resolution::Void));
    }
}
