//! Collaborators shared by the resolver, scheduler and managers.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::db::TournamentRepository;
use crate::notify::{BracketEvent, NoopNotifier, Notifier};
use crate::rewards::ProfileStore;
use crate::tournament::errors::TournamentResult;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;

/// Everything the engine talks to
#[derive(Clone)]
pub struct EngineContext {
    pub tournaments: Arc<dyn TournamentRepository>,
    pub profiles: Arc<dyn ProfileStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub config: EngineConfig,
}

impl EngineContext {
    /// Context with wall-clock time, no notifications and default tuning
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            tournaments,
            profiles,
            notifier: Arc::new(NoopNotifier),
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn notify(&self, event: BracketEvent) {
        self.notifier.notify(event);
    }

    /// Run `op` until it succeeds or fails with something other than a
    /// version conflict, at most `max_cas_retries` times.
    pub async fn retry_on_conflict<T, F, Fut>(&self, what: &str, op: F) -> TournamentResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TournamentResult<T>>,
    {
        retry_on_conflict(self.config.max_cas_retries, what, op).await
    }
}

/// Bounded retry of a compare-and-swap operation that re-reads its state
pub async fn retry_on_conflict<T, F, Fut>(max_attempts: u32, what: &str, mut op: F) -> TournamentResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TournamentResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_conflict() && attempt < max_attempts => {
                log::debug!("Conflict on {what} (attempt {attempt}/{max_attempts}), retrying");
                attempt += 1;
                tokio::task::yield_now().await;
            }
            Err(e) if e.is_conflict() => {
                log::warn!("Giving up on {what} after {max_attempts} conflicting attempts");
                return Err(e);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::errors::TournamentError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_after_conflicts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_on_conflict(5, "test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TournamentError::ConcurrencyConflict("match".into()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: TournamentResult<()> = retry_on_conflict(5, "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TournamentError::ConcurrencyConflict("match".into()))
        })
        .await;
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: TournamentResult<()> = retry_on_conflict(5, "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TournamentError::NotFound(1))
        })
        .await;
        assert!(matches!(result, Err(TournamentError::NotFound(1))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
