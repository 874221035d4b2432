//! Score comparison shared by bracket matches and standalone challenges.
//!
//! Higher total score wins; equal scores go to the lower total elapsed time;
//! if that is equal too, the first side (the higher seed, or the challenge
//! creator) wins.

use super::models::{LegScore, PlayerLegs, Seat, TournamentMatch, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Summed legs of one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregate {
    pub score: i64,
    pub elapsed_ms: i64,
    pub legs: usize,
}

impl Aggregate {
    pub fn of(legs: &PlayerLegs) -> Self {
        legs.iter().fold(Self::default(), |acc, leg| acc.plus(leg))
    }

    pub fn from_leg(leg: &LegScore) -> Self {
        Self::default().plus(leg)
    }

    fn plus(self, leg: &LegScore) -> Self {
        Self {
            score: self.score.saturating_add(leg.score),
            elapsed_ms: self.elapsed_ms.saturating_add(leg.elapsed_ms),
            legs: self.legs + 1,
        }
    }
}

/// Which comparison step settled the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidedBy {
    Score,
    ElapsedTime,
    SeedOrder,
}

/// Compare two sides; returns the winning side and the deciding step
pub fn compare(first: &Aggregate, second: &Aggregate) -> (Seat, DecidedBy) {
    match first.score.cmp(&second.score) {
        Ordering::Greater => return (Seat::Player1, DecidedBy::Score),
        Ordering::Less => return (Seat::Player2, DecidedBy::Score),
        Ordering::Equal => {}
    }
    match first.elapsed_ms.cmp(&second.elapsed_ms) {
        Ordering::Less => (Seat::Player1, DecidedBy::ElapsedTime),
        Ordering::Greater => (Seat::Player2, DecidedBy::ElapsedTime),
        Ordering::Equal => (Seat::Player1, DecidedBy::SeedOrder),
    }
}

/// Winner of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub winner_id: UserId,
    pub seat: Seat,
    pub decided_by: DecidedBy,
}

/// Decide a match from the legs on record.
///
/// Returns `None` unless both players are seated.
pub fn decide(m: &TournamentMatch) -> Option<Decision> {
    let (p1, p2) = (m.player1.as_ref()?, m.player2.as_ref()?);
    let (seat, decided_by) = compare(
        &Aggregate::of(&m.player1_legs),
        &Aggregate::of(&m.player2_legs),
    );
    let winner_id = match seat {
        Seat::Player1 => p1.user_id,
        Seat::Player2 => p2.user_id,
    };
    Some(Decision {
        winner_id,
        seat,
        decided_by,
    })
}
