//! PostgreSQL profile store with an idempotent reward ledger.
#![allow(clippy::needless_raw_string_hashes)]

use super::errors::{RewardError, RewardResult};
use super::models::{CreditOutcome, Profile, RewardCredit, RewardEntry, RewardKind};
use super::ProfileStore;
use crate::db::timeouts::{with_default_timeout, within_transaction_budget};
use crate::tournament::models::UserId;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};

/// Profile store backed by the `users`, `wallets` and `reward_entries` tables
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn credit_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        credit: &RewardCredit,
    ) -> RewardResult<CreditOutcome> {
        // Claim the key first; a concurrent payer blocks on the unique index
        // and then sees the conflict.
        let claimed = sqlx::query(
            r#"
            INSERT INTO reward_entries (user_id, tournament_id, kind, amount, balance_after, idempotency_key)
            VALUES ($1, $2, $3, $4, 0, $5)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(credit.user_id)
        .bind(credit.tournament_id)
        .bind(credit.kind.as_str())
        .bind(credit.amount)
        .bind(&credit.idempotency_key)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(entry) = claimed else {
            return Ok(CreditOutcome::AlreadyCredited);
        };
        let entry_id: i64 = entry.get("id");

        let current = sqlx::query("SELECT balance FROM wallets WHERE user_id = $1 FOR UPDATE")
            .bind(credit.user_id)
            .fetch_optional(&mut **tx)
            .await?
            .map(|row| row.get::<i64, _>("balance"))
            .unwrap_or(0);

        let balance_after = current
            .checked_add(credit.amount)
            .ok_or(RewardError::BalanceOverflow(credit.user_id))?;

        sqlx::query(
            "INSERT INTO wallets (user_id, balance, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (user_id)
             DO UPDATE SET balance = EXCLUDED.balance, updated_at = NOW()",
        )
        .bind(credit.user_id)
        .bind(balance_after)
        .execute(&mut **tx)
        .await?;

        sqlx::query("UPDATE reward_entries SET balance_after = $1 WHERE id = $2")
            .bind(balance_after)
            .bind(entry_id)
            .execute(&mut **tx)
            .await?;

        Ok(CreditOutcome::Credited { balance_after })
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn profile(&self, user_id: UserId) -> RewardResult<Option<Profile>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, display_name, level FROM users WHERE id = $1 AND is_active = TRUE",
            )
            .bind(user_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(|r| Profile {
            user_id: r.get("id"),
            display_name: r.get("display_name"),
            level: r.get::<i32, _>("level").max(0) as u32,
        }))
    }

    async fn credit_reward(&self, credit: &RewardCredit) -> RewardResult<CreditOutcome> {
        if credit.amount <= 0 {
            return Err(RewardError::InvalidAmount(credit.amount));
        }

        let mut tx = self.pool.begin().await?;
        let outcome = within_transaction_budget(Self::credit_in_tx(&mut tx, credit)).await?;
        tx.commit().await?;

        if let CreditOutcome::Credited { balance_after } = outcome {
            log::info!(
                "Credited {} ({}) to user {} for tournament {}, balance {}",
                credit.amount,
                credit.kind,
                credit.user_id,
                credit.tournament_id,
                balance_after
            );
        }
        Ok(outcome)
    }

    async fn entries(&self, user_id: UserId, limit: i64) -> RewardResult<Vec<RewardEntry>> {
        let rows = with_default_timeout(
            sqlx::query(
                r#"
                SELECT id, user_id, tournament_id, kind, amount, balance_after, idempotency_key, created_at
                FROM reward_entries
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
                "#,
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let kind = RewardKind::parse(&row.get::<String, _>("kind"))?;
                Some(RewardEntry {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    tournament_id: row.get("tournament_id"),
                    kind,
                    amount: row.get("amount"),
                    balance_after: row.get("balance_after"),
                    idempotency_key: row.get("idempotency_key"),
                    created_at: row.get("created_at"),
                })
            })
            .collect())
    }
}
