//! In-process store implementing both repositories.
//!
//! Used by tests and by the server's `--memory` mode. It enforces the same
//! compare-and-swap rules as the Postgres implementation.

use super::repository::{ChallengeRepository, TournamentRepository};
use crate::challenge::{Challenge, ChallengeError, ChallengeId, ChallengeResult};
use crate::tournament::errors::{TournamentError, TournamentResult};
use crate::tournament::models::{
    MatchId, NewTournament, Participant, Tournament, TournamentId, TournamentMatch,
    TournamentStatus, TournamentSummary, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    next_tournament_id: TournamentId,
    /// Headers; `matches` is always empty here
    tournaments: HashMap<TournamentId, Tournament>,
    matches: HashMap<MatchId, TournamentMatch>,
    challenges: HashMap<ChallengeId, Challenge>,
}

impl State {
    fn header(&self, id: TournamentId) -> TournamentResult<&Tournament> {
        self.tournaments.get(&id).ok_or(TournamentError::NotFound(id))
    }

    /// Header checked against the caller's version
    fn header_for_write(
        &mut self,
        id: TournamentId,
        expected_version: i64,
    ) -> TournamentResult<&mut Tournament> {
        let tournament = self
            .tournaments
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(id))?;
        if tournament.version != expected_version {
            return Err(TournamentError::ConcurrencyConflict(format!("tournament {id}")));
        }
        Ok(tournament)
    }

    fn matches_of(&self, tournament_id: TournamentId) -> Vec<TournamentMatch> {
        let mut matches: Vec<_> = self
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.round.cmp(&a.round).then(a.slot.cmp(&b.slot)));
        matches
    }
}

/// Store kept entirely in memory
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepository for InMemoryStore {
    async fn create_tournament(
        &self,
        request: &NewTournament,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let mut state = self.state.write().await;
        state.next_tournament_id += 1;
        let tournament = request.clone().into_tournament(state.next_tournament_id, now);
        state.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        let state = self.state.read().await;
        let mut tournament = state.header(id)?.clone();
        tournament.matches = state.matches_of(id);
        Ok(tournament)
    }

    async fn get_tournament_header(&self, id: TournamentId) -> TournamentResult<Tournament> {
        Ok(self.state.read().await.header(id)?.clone())
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<TournamentSummary>> {
        let state = self.state.read().await;
        let mut summaries: Vec<_> = state
            .tournaments
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .map(Tournament::summary)
            .collect();
        summaries.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn tick_candidates(&self, now: DateTime<Utc>) -> TournamentResult<Vec<Tournament>> {
        let state = self.state.read().await;
        let mut candidates: Vec<_> = state
            .tournaments
            .values()
            .filter(|t| match t.status {
                TournamentStatus::Registration => t.start_date <= now,
                TournamentStatus::Active => true,
                TournamentStatus::Completed => !t.rewards_paid && !t.aborted,
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|t| t.id);
        Ok(candidates)
    }

    async fn add_participant(
        &self,
        id: TournamentId,
        participant: &Participant,
        expected_version: i64,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let tournament = state.header_for_write(id, expected_version)?;
        if tournament.status != TournamentStatus::Registration {
            return Err(TournamentError::ConcurrencyConflict(format!("tournament {id}")));
        }
        tournament.participants.push(participant.clone());
        tournament.version += 1;
        tournament.updated_at = participant.registered_at;
        Ok(())
    }

    async fn remove_participant(
        &self,
        id: TournamentId,
        user_id: UserId,
        expected_version: i64,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let tournament = state.header_for_write(id, expected_version)?;
        if tournament.status != TournamentStatus::Registration {
            return Err(TournamentError::ConcurrencyConflict(format!("tournament {id}")));
        }
        tournament.participants.retain(|p| p.user_id != user_id);
        tournament.version += 1;
        Ok(())
    }

    async fn activate(
        &self,
        id: TournamentId,
        expected_version: i64,
        matches: &[TournamentMatch],
        now: DateTime<Utc>,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let tournament = state.header_for_write(id, expected_version)?;
        if tournament.status != TournamentStatus::Registration {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::Registration,
                actual: tournament.status,
            });
        }
        tournament.status = TournamentStatus::Active;
        tournament.current_round = tournament.max_participants;
        tournament.version += 1;
        tournament.updated_at = now;
        for m in matches {
            state.matches.insert(m.id, m.clone());
        }
        Ok(())
    }

    async fn advance_round(
        &self,
        id: TournamentId,
        from_round: u32,
        to_round: u32,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let tournament = state.header_for_write(id, expected_version)?;
        if tournament.status != TournamentStatus::Active || tournament.current_round != from_round {
            return Err(TournamentError::ConcurrencyConflict(format!(
                "tournament {id} round {from_round}"
            )));
        }
        tournament.current_round = to_round;
        tournament.version += 1;
        tournament.updated_at = now;
        Ok(())
    }

    async fn complete_tournament(
        &self,
        id: TournamentId,
        champion_id: Option<UserId>,
        aborted: bool,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        if state.header(id)?.status == TournamentStatus::Completed {
            return Err(TournamentError::TournamentClosed(id));
        }
        let tournament = state.header_for_write(id, expected_version)?;
        tournament.status = TournamentStatus::Completed;
        tournament.champion_id = champion_id;
        tournament.aborted = aborted;
        tournament.version += 1;
        tournament.updated_at = now;
        Ok(())
    }

    async fn mark_rewards_paid(&self, id: TournamentId) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let tournament = state
            .tournaments
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(id))?;
        tournament.rewards_paid = true;
        Ok(())
    }

    async fn get_match(&self, match_id: MatchId) -> TournamentResult<TournamentMatch> {
        self.state
            .read()
            .await
            .matches
            .get(&match_id)
            .cloned()
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    async fn find_match(
        &self,
        tournament_id: TournamentId,
        round: u32,
        slot: u32,
    ) -> TournamentResult<Option<TournamentMatch>> {
        Ok(self
            .state
            .read()
            .await
            .matches
            .values()
            .find(|m| m.tournament_id == tournament_id && m.round == round && m.slot == slot)
            .cloned())
    }

    async fn round_matches(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> TournamentResult<Vec<TournamentMatch>> {
        let state = self.state.read().await;
        Ok(state
            .matches_of(tournament_id)
            .into_iter()
            .filter(|m| m.round == round)
            .collect())
    }

    async fn update_match(&self, m: &TournamentMatch) -> TournamentResult<TournamentMatch> {
        let mut state = self.state.write().await;
        let tournament = state.header(m.tournament_id)?;
        if tournament.status != TournamentStatus::Active {
            return Err(TournamentError::TournamentClosed(m.tournament_id));
        }
        let stored = state
            .matches
            .get_mut(&m.id)
            .ok_or(TournamentError::MatchNotFound(m.id))?;
        if stored.version != m.version {
            return Err(TournamentError::ConcurrencyConflict(format!("match {}", m.id)));
        }
        *stored = m.clone();
        stored.version += 1;
        Ok(stored.clone())
    }
}

#[async_trait]
impl ChallengeRepository for InMemoryStore {
    async fn insert_challenge(&self, challenge: &Challenge) -> ChallengeResult<()> {
        self.state
            .write()
            .await
            .challenges
            .insert(challenge.id, challenge.clone());
        Ok(())
    }

    async fn get_challenge(&self, id: ChallengeId) -> ChallengeResult<Challenge> {
        self.state
            .read()
            .await
            .challenges
            .get(&id)
            .cloned()
            .ok_or(ChallengeError::NotFound(id))
    }

    async fn update_challenge(&self, challenge: &Challenge) -> ChallengeResult<Challenge> {
        let mut state = self.state.write().await;
        let stored = state
            .challenges
            .get_mut(&challenge.id)
            .ok_or(ChallengeError::NotFound(challenge.id))?;
        if stored.version != challenge.version {
            return Err(ChallengeError::ConcurrencyConflict(challenge.id));
        }
        *stored = challenge.clone();
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn open_challenges(
        &self,
        viewer_id: UserId,
        now: DateTime<Utc>,
    ) -> ChallengeResult<Vec<Challenge>> {
        let state = self.state.read().await;
        let mut open: Vec<_> = state
            .challenges
            .values()
            .filter(|c| c.is_open_to(viewer_id, now))
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{Difficulty, QuizConfig, Rewards};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap()
    }

    fn request() -> NewTournament {
        NewTournament {
            title: "Cup".to_string(),
            grade: "4".to_string(),
            unit_id: "u1".to_string(),
            registration_opens_at: t0(),
            registration_closes_at: t0() + Duration::hours(1),
            start_date: t0() + Duration::hours(2),
            round_duration_minutes: 30,
            max_participants: 4,
            min_level: 0,
            rewards: Rewards::default(),
            config: QuizConfig {
                difficulty: Difficulty::Easy,
                word_count: 10,
            },
        }
    }

    #[tokio::test]
    async fn test_tournament_version_cas() {
        let store = InMemoryStore::new();
        let t = store.create_tournament(&request(), t0()).await.unwrap();
        let participant = Participant {
            user_id: 1,
            display_name: "a".to_string(),
            level: 1,
            registered_at: t0(),
        };

        store.add_participant(t.id, &participant, 0).await.unwrap();
        let err = store
            .add_participant(t.id, &participant, 0)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let header = store.get_tournament_header(t.id).await.unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.participants.len(), 1);
    }

    #[tokio::test]
    async fn test_update_match_requires_active_tournament() {
        let store = InMemoryStore::new();
        let t = store.create_tournament(&request(), t0()).await.unwrap();
        let m = TournamentMatch::new(t.id, 4, 0, t0());
        store.activate(t.id, 0, &[m.clone()], t0()).await.unwrap();

        let written = store.update_match(&m).await.unwrap();
        assert_eq!(written.version, 1);
        assert!(store.update_match(&m).await.unwrap_err().is_conflict());

        store
            .complete_tournament(t.id, None, true, 1, t0())
            .await
            .unwrap();
        assert!(matches!(
            store.update_match(&written).await,
            Err(TournamentError::TournamentClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_tick_candidates() {
        let store = InMemoryStore::new();
        let t = store.create_tournament(&request(), t0()).await.unwrap();
        assert!(store.tick_candidates(t0()).await.unwrap().is_empty());
        let later = t.start_date;
        assert_eq!(store.tick_candidates(later).await.unwrap().len(), 1);
    }
}
