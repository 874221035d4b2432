//! Word bracket tournament server.
//!
//! Serves the HTTP API and runs the scheduler sweep that starts tournaments,
//! applies walkovers and closes rounds.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use pico_args::Arguments;
use tokio::sync::watch;
use wb_server::config::{Overrides, ServerConfig};
use wb_server::{api, logging, metrics, scheduler};
use word_bracket::db::{
    ChallengeRepository, Database, InMemoryStore, PgChallengeRepository, PgTournamentRepository,
    TournamentRepository,
};
use word_bracket::rewards::{InMemoryProfileStore, PgProfileStore, Profile, ProfileStore};
use word_bracket::{BroadcastNotifier, ChallengeGateway, EngineContext, TournamentManager};

const HELP: &str = "\
Run a word bracket tournament server

USAGE:
  wb_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  HTTP bind address          [default: env SERVER_BIND or 127.0.0.1:6970]
  --db-url        URL      Database connection string [default: env DATABASE_URL]
  --metrics-bind  IP:PORT  Prometheus listener        [default: env METRICS_BIND, disabled if unset]
  --demo-users    N        Seed N profiles (with --memory only) [default: 0]

FLAGS:
  --memory                 Keep all state in process memory instead of Postgres
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              HTTP bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus scrape address
  TICK_INTERVAL_SECS       Scheduler sweep interval       [default: 15]
  MAX_CAS_RETRIES          Attempts per contended write   [default: 5]
  CHALLENGE_TTL_HOURS      Challenge lifetime             [default: 24]
  RUST_LOG                 Log filter                     [default: info]
";

const EVENT_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        metrics_bind: pargs.opt_value_from_str::<_, SocketAddr>("--metrics-bind")?,
        memory: pargs.contains("--memory"),
    };
    let demo_users: i64 = pargs.opt_value_from_str("--demo-users")?.unwrap_or(0);

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!("Prometheus metrics on http://{}/metrics", addr);
    }

    let (tournaments, challenges, profiles, database): (
        Arc<dyn TournamentRepository>,
        Arc<dyn ChallengeRepository>,
        Arc<dyn ProfileStore>,
        Option<Database>,
    ) = match &config.database {
        Some(db_config) => {
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            tracing::info!("Database connected and migrated");

            let pool = db.pool().clone();
            let tournaments: Arc<dyn TournamentRepository> =
                Arc::new(PgTournamentRepository::new(pool.clone()));
            let challenges: Arc<dyn ChallengeRepository> =
                Arc::new(PgChallengeRepository::new(pool.clone()));
            let profiles: Arc<dyn ProfileStore> = Arc::new(PgProfileStore::new(pool));
            (tournaments, challenges, profiles, Some(db))
        }
        None => {
            tracing::warn!("Running on the in-memory store; state is lost on exit");
            let store = Arc::new(InMemoryStore::new());
            let profiles = InMemoryProfileStore::new();
            for user_id in 1..=demo_users {
                profiles
                    .insert_profile(Profile {
                        user_id,
                        display_name: format!("player{user_id}"),
                        level: 1,
                    })
                    .await;
            }
            if demo_users > 0 {
                tracing::info!("Seeded {} demo profiles", demo_users);
            }
            let tournaments: Arc<dyn TournamentRepository> = store.clone();
            let challenges: Arc<dyn ChallengeRepository> = store;
            let profiles: Arc<dyn ProfileStore> = Arc::new(profiles);
            (tournaments, challenges, profiles, None)
        }
    };

    let events = BroadcastNotifier::new(EVENT_BUFFER);
    spawn_event_log(&events);

    let ctx = EngineContext::new(tournaments, profiles)
        .with_notifier(Arc::new(events))
        .with_config(config.engine.clone());
    let manager = TournamentManager::new(ctx);
    let gateway = ChallengeGateway::new(challenges, manager.resolver().clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = scheduler::spawn(
        manager.clone(),
        Duration::from_secs(config.engine.tick_interval_secs),
        shutdown_rx,
    );

    let app = api::create_router(api::AppState {
        manager,
        challenges: gateway,
        database: database.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    tracing::info!("Shutting down server...");
    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::error!("Scheduler task ended abnormally: {}", e);
    }
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Log bracket events until the notifier is dropped
fn spawn_event_log(events: &BroadcastNotifier) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::debug!(?event, "Bracket event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event log fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
