//! Bracket construction from a participant pool.
//!
//! Pairing is a ChaCha8 shuffle seeded from the tournament id, so rebuilding
//! the same tournament always produces the same first round.

use super::bracket::{Bracket, validate_bracket_size};
use super::errors::ValidationError;
use super::models::{MatchPlayer, Participant, TournamentId};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// Derive the pairing seed for a tournament.
///
/// Offset so a tournament id never doubles as a seed used elsewhere.
pub fn derive_pairing_seed(tournament_id: TournamentId) -> u64 {
    (tournament_id as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(0xB5)
}

/// Builds the full match tree once, on the registration to active transition
#[derive(Debug, Clone, Copy)]
pub struct BracketBuilder {
    tournament_id: TournamentId,
    size: u32,
    seed: u64,
}

impl BracketBuilder {
    pub fn new(tournament_id: TournamentId, max_participants: u32) -> Result<Self, ValidationError> {
        validate_bracket_size(max_participants)?;
        Ok(Self {
            tournament_id,
            size: max_participants,
            seed: derive_pairing_seed(tournament_id),
        })
    }

    /// Override the pairing seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Participants in seeded order
    pub fn seed_order<'a>(&self, participants: &'a [Participant]) -> Vec<&'a Participant> {
        let mut order: Vec<&Participant> = participants.iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);
        order
    }

    /// Build every round and settle byes.
    ///
    /// The k-th seeded participant takes player 1 of first-round match k while
    /// k < size / 2, then player 2 of match k - size / 2, so byes spread over
    /// distinct matches.
    pub fn build(
        &self,
        participants: &[Participant],
        now: DateTime<Utc>,
    ) -> Result<Bracket, ValidationError> {
        if participants.len() > self.size as usize {
            return Err(ValidationError::TooManyParticipants {
                count: participants.len(),
                max: self.size,
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = participants.iter().find(|p| !seen.insert(p.user_id)) {
            return Err(ValidationError::DuplicateParticipant(dup.user_id));
        }

        let mut bracket = Bracket::skeleton(self.tournament_id, self.size, now)?;
        let half = self.size / 2;
        for (k, participant) in self.seed_order(participants).into_iter().enumerate() {
            let k = k as u32;
            let (slot, first_seat) = if k < half { (k, true) } else { (k - half, false) };
            let m = bracket
                .get_mut(self.size, slot)
                .ok_or(ValidationError::InvalidBracketSize(self.size))?;
            let player = Some(MatchPlayer::from(participant));
            if first_seat {
                m.player1 = player;
            } else {
                m.player2 = player;
            }
        }

        let settled = bracket.settle_byes(now)?;
        log::debug!(
            "Built bracket of {} for tournament {} with {} participants ({} matches settled)",
            self.size,
            self.tournament_id,
            participants.len(),
            settled
        );
        Ok(bracket)
    }
}
