//! Deadlines for storage round trips.
//!
//! Single statements (loading a bracket, a match CAS, a challenge lookup)
//! get [`DEFAULT_QUERY_TIMEOUT`]; multi-statement units such as a reward
//! credit get [`DEFAULT_TRANSACTION_TIMEOUT`]. A stalled connection then
//! surfaces as a retryable error instead of hanging a scheduler tick.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Budget for one statement.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Budget for a whole transaction body, commit excluded.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Runs one sqlx statement under `duration`.
///
/// ```no_run
/// use word_bracket::db::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let rows = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT id FROM tournament_matches WHERE tournament_id = $1 AND round = $2")
///         .bind(7_i64)
///         .bind(2_i32)
///         .fetch_all(pool),
/// )
/// .await?;
/// println!("{} matches in the semifinal", rows.len());
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Database(e)),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// [`with_timeout`] with [`DEFAULT_QUERY_TIMEOUT`].
pub async fn with_default_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

/// Bounds a transaction body that already speaks a domain error type.
///
/// The body's own error is returned untouched; only an expired deadline is
/// converted, so callers keep variants like `InvalidAmount` intact.
///
/// ```no_run
/// use word_bracket::db::timeouts::within_transaction_budget;
/// use word_bracket::rewards::{RewardError, RewardResult};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> RewardResult<()> {
/// let mut tx = pool.begin().await?;
/// within_transaction_budget(async {
///     sqlx::query("UPDATE users SET balance = balance + $1 WHERE id = $2")
///         .bind(100_i64)
///         .bind(42_i64)
///         .execute(&mut *tx)
///         .await?;
///     Ok::<_, RewardError>(())
/// })
/// .await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
pub async fn within_transaction_budget<F, T, E>(body: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    within_budget(DEFAULT_TRANSACTION_TIMEOUT, body).await
}

/// [`within_transaction_budget`] with an explicit deadline.
pub async fn within_budget<F, T, E>(budget: Duration, body: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    timeout(budget, body)
        .await
        .unwrap_or_else(|_| Err(TimeoutError::Timeout(budget).into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum LedgerFault {
        #[error("rejected")]
        Rejected,
        #[error(transparent)]
        Deadline(#[from] TimeoutError),
    }

    #[test]
    fn test_transaction_budget_covers_several_statements() {
        assert!(DEFAULT_TRANSACTION_TIMEOUT >= DEFAULT_QUERY_TIMEOUT * 2);
    }

    #[tokio::test]
    async fn test_stalled_match_load_times_out() {
        let stalled = std::future::pending::<Result<(), sqlx::Error>>();
        let result = with_timeout(Duration::from_millis(10), stalled).await;
        assert!(matches!(result, Err(TimeoutError::Timeout(d)) if d == Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_missing_row_is_not_a_timeout() {
        let result: TimeoutResult<()> =
            with_default_timeout(async { Err(sqlx::Error::RowNotFound) }).await;
        assert!(matches!(result, Err(TimeoutError::Database(sqlx::Error::RowNotFound))));
    }

    #[tokio::test]
    async fn test_transaction_body_error_is_kept() {
        let result: Result<(), LedgerFault> =
            within_transaction_budget(async { Err(LedgerFault::Rejected) }).await;
        assert!(matches!(result, Err(LedgerFault::Rejected)));

        let ok: Result<i64, LedgerFault> = within_transaction_budget(async { Ok(250) }).await;
        assert_eq!(ok.unwrap(), 250);
    }

    #[tokio::test]
    async fn test_stalled_transaction_hits_its_budget() {
        let budget = Duration::from_millis(10);
        let stalled = std::future::pending::<Result<(), LedgerFault>>();
        let result = within_budget(budget, stalled).await;
        assert!(matches!(
            result,
            Err(LedgerFault::Deadline(TimeoutError::Timeout(d))) if d == budget
        ));
    }

    #[test]
    fn test_timeout_message_names_the_budget() {
        let err = TimeoutError::Timeout(DEFAULT_QUERY_TIMEOUT);
        assert_eq!(err.to_string(), "Database operation timed out after 5s");
    }
}
