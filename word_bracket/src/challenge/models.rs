//! Challenge data models.

use super::errors::ChallengeError;
use crate::tournament::errors::ValidationError;
use crate::tournament::models::{
    Difficulty, LegScore, MAX_WORD_COUNT, MIN_WORD_COUNT, MatchId, Seat, UserId,
};
use crate::tournament::scoring::{self, Aggregate, DecidedBy};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Challenge ID type
pub type ChallengeId = Uuid;

/// Who may join a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Friend,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Friend => "friend",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Visibility::Public),
            "friend" => Some(Visibility::Friend),
            _ => None,
        }
    }
}

/// Quiz settings of a challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    pub unit_id: String,
    pub difficulty: Difficulty,
    pub word_count: u32,
    pub visibility: Visibility,
    /// Required for friend challenges, absent for public ones
    #[serde(default)]
    pub target_friend_id: Option<UserId>,
}

impl ChallengeConfig {
    pub fn validate(&self, creator_id: UserId) -> Result<(), ValidationError> {
        if self.unit_id.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "unit_id",
                reason: "must not be empty".to_string(),
            });
        }
        if !(MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&self.word_count) {
            return Err(ValidationError::InvalidField {
                field: "word_count",
                reason: format!("must be between {MIN_WORD_COUNT} and {MAX_WORD_COUNT}"),
            });
        }
        match (self.visibility, self.target_friend_id) {
            (Visibility::Public, None) => Ok(()),
            (Visibility::Public, Some(_)) => Err(ValidationError::InvalidField {
                field: "target_friend_id",
                reason: "public challenges cannot target a user".to_string(),
            }),
            (Visibility::Friend, None) => Err(ValidationError::InvalidField {
                field: "target_friend_id",
                reason: "friend challenges need a target".to_string(),
            }),
            (Visibility::Friend, Some(target)) if target == creator_id => {
                Err(ValidationError::InvalidField {
                    field: "target_friend_id",
                    reason: "cannot challenge yourself".to_string(),
                })
            }
            (Visibility::Friend, Some(_)) => Ok(()),
        }
    }
}

/// Challenge progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Pending,
    Completed,
    Expired,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Completed => "completed",
            ChallengeStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ChallengeStatus::Pending),
            "completed" => Some(ChallengeStatus::Completed),
            "expired" => Some(ChallengeStatus::Expired),
            _ => None,
        }
    }
}

/// Standalone duel between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub creator_id: UserId,
    pub config: ChallengeConfig,
    pub creator_score: LegScore,
    pub opponent_id: Option<UserId>,
    pub opponent_score: Option<LegScore>,
    pub winner_id: Option<UserId>,
    pub status: ChallengeStatus,
    /// Bracket match whose legs this challenge plays
    pub tournament_match_id: Option<MatchId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Challenge {
    pub fn new(
        creator_id: UserId,
        config: ChallengeConfig,
        creator_score: LegScore,
        tournament_match_id: Option<MatchId>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            creator_id,
            config,
            creator_score,
            opponent_id: None,
            opponent_score: None,
            winner_id: None,
            status: ChallengeStatus::Pending,
            tournament_match_id,
            created_at: now,
            expires_at: now + ttl,
            completed_at: None,
            version: 0,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ChallengeStatus::Expired
            || (self.status == ChallengeStatus::Pending && now >= self.expires_at)
    }

    /// Whether `viewer_id` would see this challenge in the open list
    pub fn is_open_to(&self, viewer_id: UserId, now: DateTime<Utc>) -> bool {
        if self.status != ChallengeStatus::Pending || self.is_expired(now) {
            return false;
        }
        if self.creator_id == viewer_id {
            return false;
        }
        match self.config.visibility {
            Visibility::Public => true,
            Visibility::Friend => self.config.target_friend_id == Some(viewer_id),
        }
    }

    /// Check that `opponent_id` may join right now
    pub fn check_joinable(&self, opponent_id: UserId, now: DateTime<Utc>) -> Result<(), ChallengeError> {
        match self.status {
            ChallengeStatus::Completed => return Err(ChallengeError::AlreadyCompleted(self.id)),
            ChallengeStatus::Expired => return Err(ChallengeError::Expired(self.id)),
            ChallengeStatus::Pending => {}
        }
        if self.is_expired(now) {
            return Err(ChallengeError::Expired(self.id));
        }
        if opponent_id == self.creator_id {
            return Err(ChallengeError::SelfJoin);
        }
        if self.config.visibility == Visibility::Friend
            && self.config.target_friend_id != Some(opponent_id)
        {
            return Err(ChallengeError::NotTarget {
                challenge_id: self.id,
                user_id: opponent_id,
            });
        }
        Ok(())
    }

    /// Record the opponent's score and decide the challenge.
    ///
    /// The creator plays the role of the higher seed on a full tie.
    pub fn complete(
        &mut self,
        opponent_id: UserId,
        opponent_score: LegScore,
        now: DateTime<Utc>,
    ) -> DecidedBy {
        let (seat, decided_by) = scoring::compare(
            &Aggregate::from_leg(&self.creator_score),
            &Aggregate::from_leg(&opponent_score),
        );
        self.opponent_id = Some(opponent_id);
        self.opponent_score = Some(opponent_score);
        self.winner_id = Some(match seat {
            Seat::Player1 => self.creator_id,
            Seat::Player2 => opponent_id,
        });
        self.status = ChallengeStatus::Completed;
        self.completed_at = Some(now);
        decided_by
    }
}
