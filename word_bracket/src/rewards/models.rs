//! Reward data models.

use crate::tournament::models::{TournamentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Player profile as seen by the tournament engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub level: u32,
}

/// Placement a reward is paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    First,
    Second,
    Third,
    Participation,
}

impl RewardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardKind::First => "first",
            RewardKind::Second => "second",
            RewardKind::Third => "third",
            RewardKind::Participation => "participation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "first" => Some(RewardKind::First),
            "second" => Some(RewardKind::Second),
            "third" => Some(RewardKind::Third),
            "participation" => Some(RewardKind::Participation),
            _ => None,
        }
    }
}

impl std::fmt::Display for RewardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reward to credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardCredit {
    pub user_id: UserId,
    pub tournament_id: TournamentId,
    pub kind: RewardKind,
    pub amount: i64,
    pub idempotency_key: String,
}

impl RewardCredit {
    pub fn new(tournament_id: TournamentId, user_id: UserId, kind: RewardKind, amount: i64) -> Self {
        Self {
            user_id,
            tournament_id,
            kind,
            amount,
            idempotency_key: idempotency_key(tournament_id, kind, user_id),
        }
    }
}

/// Ledger key of a tournament reward; one credit per placement per user
pub fn idempotency_key(tournament_id: TournamentId, kind: RewardKind, user_id: UserId) -> String {
    format!("tournament:{tournament_id}:{kind}:{user_id}")
}

/// Result of a credit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    Credited { balance_after: i64 },
    /// The idempotency key was already on the ledger
    AlreadyCredited,
}

/// Ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub id: i64,
    pub user_id: UserId,
    pub tournament_id: TournamentId,
    pub kind: RewardKind,
    pub amount: i64,
    pub balance_after: i64,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_format() {
        let credit = RewardCredit::new(12, 7, RewardKind::Third, 25);
        assert_eq!(credit.idempotency_key, "tournament:12:third:7");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(RewardKind::parse("participation"), Some(RewardKind::Participation));
        assert_eq!(RewardKind::parse("bonus"), None);
    }
}
