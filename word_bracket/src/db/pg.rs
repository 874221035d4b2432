//! PostgreSQL repositories.
#![allow(clippy::needless_raw_string_hashes)]

use super::repository::{ChallengeRepository, TournamentRepository};
use super::timeouts::with_default_timeout;
use crate::challenge::{
    Challenge, ChallengeConfig, ChallengeError, ChallengeId, ChallengeResult, ChallengeStatus,
    Visibility,
};
use crate::tournament::errors::{TournamentError, TournamentResult};
use crate::tournament::models::{
    Difficulty, LegScore, MatchId, MatchPlayer, MatchStatus, NewTournament, Participant,
    PlayerLegs, QuizConfig, Resolution, Rewards, Tournament, TournamentId, TournamentMatch,
    TournamentStatus, TournamentSummary, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const TOURNAMENT_COLUMNS: &str = "id, title, grade, unit_id, status, registration_opens_at, \
     registration_closes_at, start_date, round_duration_minutes, current_round, champion_id, \
     max_participants, min_level, reward_first, reward_second, reward_third, \
     reward_participation, difficulty, word_count, aborted, rewards_paid, version, \
     created_at, updated_at";

const MATCH_COLUMNS: &str = "id, tournament_id, round, slot, player1_id, player1_name, \
     player2_id, player2_name, player1_legs, player2_legs, winner_id, status, resolution, \
     forfeited_by, version, updated_at";

const CHALLENGE_COLUMNS: &str = "id, creator_id, unit_id, difficulty, word_count, visibility, \
     target_friend_id, creator_score, creator_elapsed_ms, opponent_id, opponent_score, \
     opponent_elapsed_ms, winner_id, status, tournament_match_id, created_at, expires_at, \
     completed_at, version";

fn uint(row: &PgRow, column: &str) -> u32 {
    row.get::<i32, _>(column).max(0) as u32
}

fn corrupt(what: &str, value: &str) -> TournamentError {
    TournamentError::Corrupt(format!("unknown {what} '{value}'"))
}

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    let status: String = row.get("status");
    let difficulty: String = row.get("difficulty");
    Ok(Tournament {
        id: row.get("id"),
        title: row.get("title"),
        grade: row.get("grade"),
        unit_id: row.get("unit_id"),
        status: TournamentStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        registration_opens_at: row.get("registration_opens_at"),
        registration_closes_at: row.get("registration_closes_at"),
        start_date: row.get("start_date"),
        round_duration_minutes: uint(row, "round_duration_minutes"),
        participants: Vec::new(),
        matches: Vec::new(),
        current_round: uint(row, "current_round"),
        champion_id: row.get("champion_id"),
        max_participants: uint(row, "max_participants"),
        min_level: uint(row, "min_level"),
        rewards: Rewards {
            first: row.get("reward_first"),
            second: row.get("reward_second"),
            third: row.get("reward_third"),
            participation: row.get("reward_participation"),
        },
        config: QuizConfig {
            difficulty: Difficulty::parse(&difficulty)
                .ok_or_else(|| corrupt("difficulty", &difficulty))?,
            word_count: uint(row, "word_count"),
        },
        aborted: row.get("aborted"),
        rewards_paid: row.get("rewards_paid"),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn player_from_row(row: &PgRow, id: &str, name: &str) -> Option<MatchPlayer> {
    let user_id: Option<i64> = row.get(id);
    let display_name: Option<String> = row.get(name);
    user_id.map(|user_id| MatchPlayer {
        user_id,
        display_name: display_name.unwrap_or_default(),
    })
}

fn match_from_row(row: &PgRow) -> TournamentResult<TournamentMatch> {
    let status: String = row.get("status");
    let resolution: Option<String> = row.get("resolution");
    let resolution = match resolution {
        Some(value) => Some(Resolution::parse(&value).ok_or_else(|| corrupt("resolution", &value))?),
        None => None,
    };
    Ok(TournamentMatch {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round: uint(row, "round"),
        slot: uint(row, "slot"),
        player1: player_from_row(row, "player1_id", "player1_name"),
        player2: player_from_row(row, "player2_id", "player2_name"),
        player1_legs: serde_json::from_value(row.get("player1_legs"))?,
        player2_legs: serde_json::from_value(row.get("player2_legs"))?,
        winner_id: row.get("winner_id"),
        status: MatchStatus::parse(&status).ok_or_else(|| corrupt("match status", &status))?,
        resolution,
        forfeited_by: row.get("forfeited_by"),
        version: row.get("version"),
        updated_at: row.get("updated_at"),
    })
}

fn legs_json(legs: &PlayerLegs) -> TournamentResult<serde_json::Value> {
    Ok(serde_json::to_value(legs)?)
}

/// Tournament repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn participants(&self, id: TournamentId) -> TournamentResult<Vec<Participant>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT user_id, display_name, level, registered_at
                 FROM tournament_participants
                 WHERE tournament_id = $1
                 ORDER BY registered_at, user_id",
            )
            .bind(id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .iter()
            .map(|r| Participant {
                user_id: r.get("user_id"),
                display_name: r.get("display_name"),
                level: uint(r, "level"),
                registered_at: r.get("registered_at"),
            })
            .collect())
    }

    async fn matches(&self, id: TournamentId) -> TournamentResult<Vec<TournamentMatch>> {
        let rows = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM tournament_matches
                 WHERE tournament_id = $1
                 ORDER BY round DESC, slot"
            ))
            .bind(id)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(match_from_row).collect()
    }

    /// Explain why a tournament CAS matched no row
    async fn tournament_write_failure(&self, id: TournamentId) -> TournamentError {
        let row = sqlx::query("SELECT status FROM tournaments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        match row {
            Ok(None) => TournamentError::NotFound(id),
            Ok(Some(r)) if r.get::<String, _>("status") == TournamentStatus::Completed.as_str() => {
                TournamentError::TournamentClosed(id)
            }
            Ok(Some(_)) => TournamentError::ConcurrencyConflict(format!("tournament {id}")),
            Err(e) => TournamentError::Database(e),
        }
    }

    /// Bump the tournament version inside `tx` if it still equals `expected_version`
    async fn bump_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: TournamentId,
        expected_version: i64,
    ) -> TournamentResult<bool> {
        let row = sqlx::query(
            "UPDATE tournaments SET version = version + 1, updated_at = NOW()
             WHERE id = $1 AND version = $2 AND status = 'registration'
             RETURNING id",
        )
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn create_tournament(
        &self,
        request: &NewTournament,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let row = with_default_timeout(
            sqlx::query(
                r#"
                INSERT INTO tournaments (
                    title, grade, unit_id, status, registration_opens_at, registration_closes_at,
                    start_date, round_duration_minutes, current_round, max_participants, min_level,
                    reward_first, reward_second, reward_third, reward_participation,
                    difficulty, word_count, created_at, updated_at
                )
                VALUES ($1, $2, $3, 'registration', $4, $5, $6, $7, $8, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
                RETURNING id
                "#,
            )
            .bind(&request.title)
            .bind(&request.grade)
            .bind(&request.unit_id)
            .bind(request.registration_opens_at)
            .bind(request.registration_closes_at)
            .bind(request.start_date)
            .bind(request.round_duration_minutes as i32)
            .bind(request.max_participants as i32)
            .bind(request.min_level as i32)
            .bind(request.rewards.first)
            .bind(request.rewards.second)
            .bind(request.rewards.third)
            .bind(request.rewards.participation)
            .bind(request.config.difficulty.as_str())
            .bind(request.config.word_count as i32)
            .bind(now)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(request.clone().into_tournament(row.get("id"), now))
    }

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        let mut tournament = self.get_tournament_header(id).await?;
        tournament.matches = self.matches(id).await?;
        Ok(tournament)
    }

    async fn get_tournament_header(&self, id: TournamentId) -> TournamentResult<Tournament> {
        let row = with_default_timeout(
            sqlx::query(&format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(TournamentError::NotFound(id))?;

        let mut tournament = tournament_from_row(&row)?;
        tournament.participants = self.participants(id).await?;
        Ok(tournament)
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<TournamentSummary>> {
        let rows = with_default_timeout(
            sqlx::query(
                r#"
                SELECT t.id, t.title, t.grade, t.unit_id, t.status, t.max_participants,
                       t.current_round, t.champion_id, t.start_date,
                       (SELECT COUNT(*) FROM tournament_participants p WHERE p.tournament_id = t.id)
                           AS participant_count
                FROM tournaments t
                WHERE $1::TEXT IS NULL OR t.status = $1
                ORDER BY t.start_date, t.id
                "#,
            )
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter()
            .map(|r| {
                let status: String = r.get("status");
                Ok(TournamentSummary {
                    id: r.get("id"),
                    title: r.get("title"),
                    grade: r.get("grade"),
                    unit_id: r.get("unit_id"),
                    status: TournamentStatus::parse(&status)
                        .ok_or_else(|| corrupt("status", &status))?,
                    participant_count: r.get::<i64, _>("participant_count").max(0) as usize,
                    max_participants: uint(r, "max_participants"),
                    current_round: uint(r, "current_round"),
                    champion_id: r.get("champion_id"),
                    start_date: r.get("start_date"),
                })
            })
            .collect()
    }

    async fn tick_candidates(&self, now: DateTime<Utc>) -> TournamentResult<Vec<Tournament>> {
        let rows = with_default_timeout(
            sqlx::query(
                "SELECT id FROM tournaments
                 WHERE (status = 'registration' AND start_date <= $1)
                    OR status = 'active'
                    OR (status = 'completed' AND NOT rewards_paid AND NOT aborted)
                 ORDER BY id",
            )
            .bind(now)
            .fetch_all(&self.pool),
        )
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            match self.get_tournament_header(row.get("id")).await {
                Ok(t) => candidates.push(t),
                Err(TournamentError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(candidates)
    }

    async fn add_participant(
        &self,
        id: TournamentId,
        participant: &Participant,
        expected_version: i64,
    ) -> TournamentResult<()> {
        let mut tx = self.pool.begin().await?;
        if !Self::bump_version(&mut tx, id, expected_version).await? {
            drop(tx);
            return Err(self.tournament_write_failure(id).await);
        }

        sqlx::query(
            "INSERT INTO tournament_participants (tournament_id, user_id, display_name, level, registered_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(participant.user_id)
        .bind(&participant.display_name)
        .bind(participant.level as i32)
        .bind(participant.registered_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_participant(
        &self,
        id: TournamentId,
        user_id: UserId,
        expected_version: i64,
    ) -> TournamentResult<()> {
        let mut tx = self.pool.begin().await?;
        if !Self::bump_version(&mut tx, id, expected_version).await? {
            drop(tx);
            return Err(self.tournament_write_failure(id).await);
        }

        sqlx::query("DELETE FROM tournament_participants WHERE tournament_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn activate(
        &self,
        id: TournamentId,
        expected_version: i64,
        matches: &[TournamentMatch],
        now: DateTime<Utc>,
    ) -> TournamentResult<()> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE tournaments
             SET status = 'active', current_round = max_participants,
                 version = version + 1, updated_at = $3
             WHERE id = $1 AND version = $2 AND status = 'registration'
             RETURNING id",
        )
        .bind(id)
        .bind(expected_version)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;
        if updated.is_none() {
            drop(tx);
            return Err(self.tournament_write_failure(id).await);
        }

        for m in matches {
            sqlx::query(&format!(
                "INSERT INTO tournament_matches ({MATCH_COLUMNS})
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
            ))
            .bind(m.id)
            .bind(m.tournament_id)
            .bind(m.round as i32)
            .bind(m.slot as i32)
            .bind(m.player1.as_ref().map(|p| p.user_id))
            .bind(m.player1.as_ref().map(|p| p.display_name.as_str()))
            .bind(m.player2.as_ref().map(|p| p.user_id))
            .bind(m.player2.as_ref().map(|p| p.display_name.as_str()))
            .bind(legs_json(&m.player1_legs)?)
            .bind(legs_json(&m.player2_legs)?)
            .bind(m.winner_id)
            .bind(m.status.as_str())
            .bind(m.resolution.map(|r| r.as_str()))
            .bind(m.forfeited_by)
            .bind(m.version)
            .bind(m.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
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
        let updated = with_default_timeout(
            sqlx::query(
                "UPDATE tournaments
                 SET current_round = $4, version = version + 1, updated_at = $5
                 WHERE id = $1 AND version = $2 AND current_round = $3 AND status = 'active'
                 RETURNING id",
            )
            .bind(id)
            .bind(expected_version)
            .bind(from_round as i32)
            .bind(to_round as i32)
            .bind(now)
            .fetch_optional(&self.pool),
        )
        .await?;

        match updated {
            Some(_) => Ok(()),
            None => Err(self.tournament_write_failure(id).await),
        }
    }

    async fn complete_tournament(
        &self,
        id: TournamentId,
        champion_id: Option<UserId>,
        aborted: bool,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> TournamentResult<()> {
        let updated = with_default_timeout(
            sqlx::query(
                "UPDATE tournaments
                 SET status = 'completed', champion_id = $3, aborted = $4,
                     version = version + 1, updated_at = $5
                 WHERE id = $1 AND version = $2 AND status <> 'completed'
                 RETURNING id",
            )
            .bind(id)
            .bind(expected_version)
            .bind(champion_id)
            .bind(aborted)
            .bind(now)
            .fetch_optional(&self.pool),
        )
        .await?;

        match updated {
            Some(_) => Ok(()),
            None => Err(self.tournament_write_failure(id).await),
        }
    }

    async fn mark_rewards_paid(&self, id: TournamentId) -> TournamentResult<()> {
        with_default_timeout(
            sqlx::query("UPDATE tournaments SET rewards_paid = TRUE WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn get_match(&self, match_id: MatchId) -> TournamentResult<TournamentMatch> {
        let row = with_default_timeout(
            sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM tournament_matches WHERE id = $1"))
                .bind(match_id)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(TournamentError::MatchNotFound(match_id))?;
        match_from_row(&row)
    }

    async fn find_match(
        &self,
        tournament_id: TournamentId,
        round: u32,
        slot: u32,
    ) -> TournamentResult<Option<TournamentMatch>> {
        let row = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM tournament_matches
                 WHERE tournament_id = $1 AND round = $2 AND slot = $3"
            ))
            .bind(tournament_id)
            .bind(round as i32)
            .bind(slot as i32)
            .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn round_matches(
        &self,
        tournament_id: TournamentId,
        round: u32,
    ) -> TournamentResult<Vec<TournamentMatch>> {
        let rows = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM tournament_matches
                 WHERE tournament_id = $1 AND round = $2
                 ORDER BY slot"
            ))
            .bind(tournament_id)
            .bind(round as i32)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(match_from_row).collect()
    }

    async fn update_match(&self, m: &TournamentMatch) -> TournamentResult<TournamentMatch> {
        // The tournament join makes every match write fail once the
        // tournament is completed or aborted.
        let updated = with_default_timeout(
            sqlx::query(
                r#"
                UPDATE tournament_matches AS m
                SET player1_id = $3, player1_name = $4, player2_id = $5, player2_name = $6,
                    player1_legs = $7, player2_legs = $8, winner_id = $9, status = $10,
                    resolution = $11, forfeited_by = $12, version = m.version + 1,
                    updated_at = $13
                FROM tournaments AS t
                WHERE m.id = $1 AND m.version = $2
                  AND t.id = m.tournament_id AND t.status = 'active'
                RETURNING m.version
                "#,
            )
            .bind(m.id)
            .bind(m.version)
            .bind(m.player1.as_ref().map(|p| p.user_id))
            .bind(m.player1.as_ref().map(|p| p.display_name.as_str()))
            .bind(m.player2.as_ref().map(|p| p.user_id))
            .bind(m.player2.as_ref().map(|p| p.display_name.as_str()))
            .bind(legs_json(&m.player1_legs)?)
            .bind(legs_json(&m.player2_legs)?)
            .bind(m.winner_id)
            .bind(m.status.as_str())
            .bind(m.resolution.map(|r| r.as_str()))
            .bind(m.forfeited_by)
            .bind(m.updated_at)
            .fetch_optional(&self.pool),
        )
        .await?;

        if let Some(row) = updated {
            let mut written = m.clone();
            written.version = row.get("version");
            return Ok(written);
        }

        let state = with_default_timeout(
            sqlx::query(
                "SELECT t.status FROM tournament_matches m
                 JOIN tournaments t ON t.id = m.tournament_id
                 WHERE m.id = $1",
            )
            .bind(m.id)
            .fetch_optional(&self.pool),
        )
        .await?;

        match state {
            None => Err(TournamentError::MatchNotFound(m.id)),
            Some(r) if r.get::<String, _>("status") != TournamentStatus::Active.as_str() => {
                Err(TournamentError::TournamentClosed(m.tournament_id))
            }
            Some(_) => Err(TournamentError::ConcurrencyConflict(format!("match {}", m.id))),
        }
    }
}

fn challenge_from_row(row: &PgRow) -> ChallengeResult<Challenge> {
    let field = |what: &str, value: &str| ChallengeError::Corrupt(format!("unknown {what} '{value}'"));
    let difficulty: String = row.get("difficulty");
    let visibility: String = row.get("visibility");
    let status: String = row.get("status");
    let opponent_score: Option<i64> = row.get("opponent_score");
    let opponent_elapsed: Option<i64> = row.get("opponent_elapsed_ms");

    Ok(Challenge {
        id: row.get("id"),
        creator_id: row.get("creator_id"),
        config: ChallengeConfig {
            unit_id: row.get("unit_id"),
            difficulty: Difficulty::parse(&difficulty)
                .ok_or_else(|| field("difficulty", &difficulty))?,
            word_count: uint(row, "word_count"),
            visibility: Visibility::parse(&visibility)
                .ok_or_else(|| field("visibility", &visibility))?,
            target_friend_id: row.get("target_friend_id"),
        },
        creator_score: LegScore::new(row.get("creator_score"), row.get("creator_elapsed_ms")),
        opponent_id: row.get("opponent_id"),
        opponent_score: opponent_score
            .zip(opponent_elapsed)
            .map(|(score, elapsed)| LegScore::new(score, elapsed)),
        winner_id: row.get("winner_id"),
        status: ChallengeStatus::parse(&status).ok_or_else(|| field("status", &status))?,
        tournament_match_id: row.get("tournament_match_id"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        completed_at: row.get("completed_at"),
        version: row.get("version"),
    })
}

/// Challenge repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgChallengeRepository {
    pool: PgPool,
}

impl PgChallengeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChallengeRepository for PgChallengeRepository {
    async fn insert_challenge(&self, c: &Challenge) -> ChallengeResult<()> {
        with_default_timeout(
            sqlx::query(&format!(
                "INSERT INTO challenges ({CHALLENGE_COLUMNS})
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"
            ))
            .bind(c.id)
            .bind(c.creator_id)
            .bind(&c.config.unit_id)
            .bind(c.config.difficulty.as_str())
            .bind(c.config.word_count as i32)
            .bind(c.config.visibility.as_str())
            .bind(c.config.target_friend_id)
            .bind(c.creator_score.score)
            .bind(c.creator_score.elapsed_ms)
            .bind(c.opponent_id)
            .bind(c.opponent_score.map(|s| s.score))
            .bind(c.opponent_score.map(|s| s.elapsed_ms))
            .bind(c.winner_id)
            .bind(c.status.as_str())
            .bind(c.tournament_match_id)
            .bind(c.created_at)
            .bind(c.expires_at)
            .bind(c.completed_at)
            .bind(c.version)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn get_challenge(&self, id: ChallengeId) -> ChallengeResult<Challenge> {
        let row = with_default_timeout(
            sqlx::query(&format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(ChallengeError::NotFound(id))?;
        challenge_from_row(&row)
    }

    async fn update_challenge(&self, c: &Challenge) -> ChallengeResult<Challenge> {
        let updated = with_default_timeout(
            sqlx::query(
                "UPDATE challenges
                 SET opponent_id = $3, opponent_score = $4, opponent_elapsed_ms = $5,
                     winner_id = $6, status = $7, completed_at = $8, version = version + 1
                 WHERE id = $1 AND version = $2
                 RETURNING version",
            )
            .bind(c.id)
            .bind(c.version)
            .bind(c.opponent_id)
            .bind(c.opponent_score.map(|s| s.score))
            .bind(c.opponent_score.map(|s| s.elapsed_ms))
            .bind(c.winner_id)
            .bind(c.status.as_str())
            .bind(c.completed_at)
            .fetch_optional(&self.pool),
        )
        .await?;

        match updated {
            Some(row) => {
                let mut written = c.clone();
                written.version = row.get("version");
                Ok(written)
            }
            None => {
                // Distinguish a missing row from a lost race
                self.get_challenge(c.id).await?;
                Err(ChallengeError::ConcurrencyConflict(c.id))
            }
        }
    }

    async fn open_challenges(
        &self,
        viewer_id: UserId,
        now: DateTime<Utc>,
    ) -> ChallengeResult<Vec<Challenge>> {
        let rows = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {CHALLENGE_COLUMNS} FROM challenges
                 WHERE status = 'pending' AND expires_at > $2 AND creator_id <> $1
                   AND (visibility = 'public' OR target_friend_id = $1)
                 ORDER BY created_at DESC
                 LIMIT 100"
            ))
            .bind(viewer_id)
            .bind(now)
            .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(challenge_from_row).collect()
    }
}
