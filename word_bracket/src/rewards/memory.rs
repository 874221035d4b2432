//! In-process profile store for tests and the server's `--memory` mode.

use super::errors::{RewardError, RewardResult};
use super::models::{CreditOutcome, Profile, RewardCredit, RewardEntry};
use super::ProfileStore;
use crate::tournament::models::UserId;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Ledger {
    profiles: HashMap<UserId, Profile>,
    balances: HashMap<UserId, i64>,
    entries: Vec<RewardEntry>,
}

/// Profile store kept in memory
#[derive(Clone, Default)]
pub struct InMemoryProfileStore {
    inner: Arc<Mutex<Ledger>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.inner
            .lock()
            .await
            .profiles
            .insert(profile.user_id, profile);
    }

    /// Remove a profile, as when an account is deleted
    pub async fn remove_profile(&self, user_id: UserId) -> Option<Profile> {
        self.inner.lock().await.profiles.remove(&user_id)
    }

    pub async fn balance(&self, user_id: UserId) -> i64 {
        self.inner
            .lock()
            .await
            .balances
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }

    /// Every ledger entry in insertion order
    pub async fn all_entries(&self) -> Vec<RewardEntry> {
        self.inner.lock().await.entries.clone()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn profile(&self, user_id: UserId) -> RewardResult<Option<Profile>> {
        Ok(self.inner.lock().await.profiles.get(&user_id).cloned())
    }

    async fn credit_reward(&self, credit: &RewardCredit) -> RewardResult<CreditOutcome> {
        if credit.amount <= 0 {
            return Err(RewardError::InvalidAmount(credit.amount));
        }

        let mut ledger = self.inner.lock().await;
        if ledger
            .entries
            .iter()
            .any(|e| e.idempotency_key == credit.idempotency_key)
        {
            return Ok(CreditOutcome::AlreadyCredited);
        }

        let current = ledger.balances.get(&credit.user_id).copied().unwrap_or(0);
        let balance_after = current
            .checked_add(credit.amount)
            .ok_or(RewardError::BalanceOverflow(credit.user_id))?;
        ledger.balances.insert(credit.user_id, balance_after);

        let id = ledger.entries.len() as i64 + 1;
        ledger.entries.push(RewardEntry {
            id,
            user_id: credit.user_id,
            tournament_id: credit.tournament_id,
            kind: credit.kind,
            amount: credit.amount,
            balance_after,
            idempotency_key: credit.idempotency_key.clone(),
            created_at: Utc::now(),
        });

        Ok(CreditOutcome::Credited { balance_after })
    }

    async fn entries(&self, user_id: UserId, limit: i64) -> RewardResult<Vec<RewardEntry>> {
        let ledger = self.inner.lock().await;
        Ok(ledger
            .entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::RewardKind;

    #[tokio::test]
    async fn test_credit_is_idempotent() {
        let store = InMemoryProfileStore::new();
        let credit = RewardCredit::new(1, 9, RewardKind::First, 100);

        assert_eq!(
            store.credit_reward(&credit).await.unwrap(),
            CreditOutcome::Credited { balance_after: 100 }
        );
        assert_eq!(
            store.credit_reward(&credit).await.unwrap(),
            CreditOutcome::AlreadyCredited
        );
        assert_eq!(store.balance(9).await, 100);
        assert_eq!(store.entries(9, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let store = InMemoryProfileStore::new();
        let credit = RewardCredit::new(1, 9, RewardKind::Participation, 0);
        assert!(matches!(
            store.credit_reward(&credit).await,
            Err(RewardError::InvalidAmount(0))
        ));
    }

    #[tokio::test]
    async fn test_entries_newest_first() {
        let store = InMemoryProfileStore::new();
        store
            .credit_reward(&RewardCredit::new(1, 5, RewardKind::Third, 10))
            .await
            .unwrap();
        store
            .credit_reward(&RewardCredit::new(2, 5, RewardKind::First, 50))
            .await
            .unwrap();

        let entries = store.entries(5, 10).await.unwrap();
        assert_eq!(entries[0].tournament_id, 2);
        assert_eq!(entries[0].balance_after, 60);
        assert_eq!(entries[1].tournament_id, 1);
    }
}
