//! Background scheduler loop.
//!
//! Drives [`TournamentManager::tick`] on a fixed interval. A sweep is
//! idempotent, so a missed or doubled tick only delays or repeats work that
//! the next one would do anyway.

use crate::{logging, metrics};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use word_bracket::TournamentManager;
use word_bracket::tournament::TickReport;

/// Spawn the sweep loop; it exits once `shutdown` flips to true or its sender drops
pub fn spawn(
    manager: TournamentManager,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval_secs = interval.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => run_once(&manager).await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped");
    })
}

/// One sweep with logging and metrics
pub async fn run_once(manager: &TournamentManager) {
    let started = Instant::now();
    match manager.tick().await {
        Ok(report) => {
            let elapsed = started.elapsed();
            metrics::record_tick(&report, elapsed.as_secs_f64() * 1000.0);
            logging::log_performance("scheduler_tick", elapsed.as_millis() as u64);

            if report.failures > 0 {
                tracing::warn!(
                    checked = report.tournaments_checked,
                    failures = report.failures,
                    "Scheduler sweep finished with failures"
                );
            } else if report != TickReport::default() {
                tracing::info!(
                    checked = report.tournaments_checked,
                    started = report.started,
                    walkovers = report.walkovers,
                    rounds_advanced = report.rounds_advanced,
                    completed = report.completed,
                    rewards_paid = report.rewards_paid,
                    "Scheduler sweep"
                );
            }
        }
        Err(e) => {
            metrics::tick_errors_total();
            tracing::error!(error = %e, "Scheduler sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use word_bracket::EngineContext;
    use word_bracket::db::InMemoryStore;
    use word_bracket::rewards::InMemoryProfileStore;

    fn manager() -> TournamentManager {
        TournamentManager::new(EngineContext::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryProfileStore::new()),
        ))
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let handle = spawn(manager(), Duration::from_millis(10), rx);

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_loop_stops_when_sender_drops() {
        let (tx, rx) = watch::channel(false);
        let handle = spawn(manager(), Duration::from_secs(60), rx);
        drop(tx);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_once_on_empty_store() {
        run_once(&manager()).await;
    }
}
